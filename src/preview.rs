//! Human-readable rendering of simulation and execution results
//!
//! Everything in this module is a pure function of its inputs: no network,
//! no side effects, deterministic output for identical input. List ordering
//! is whatever the simulator produced; nothing is re-sorted here.

use crate::simulator::{SimulationResult, SimulationStatus};
use crate::transfer::ExecutionSummary;

/// Events shown before the report truncates with a `+N more` trailer
pub const EVENT_DISPLAY_CAP: usize = 5;

const RULE: &str = "=======================================================";

/// Display context for labeling report rows
#[derive(Debug, Clone)]
pub struct PreviewContext<'a> {
    pub sender: &'a str,
    pub recipient: &'a str,
    /// Domain the recipient resolved from, if any
    pub recipient_label: Option<&'a str>,
    pub amount_mist: u64,
}

/// Render a dry-run result as the pre-confirmation report
pub fn format_preview(result: &SimulationResult, ctx: &PreviewContext<'_>) -> String {
    let mut out = String::new();
    push_line(&mut out, RULE);
    push_line(&mut out, "  Transfer preview (dry run)");
    push_line(&mut out, RULE);

    match &result.status {
        SimulationStatus::Success => push_line(&mut out, "  Status: success"),
        SimulationStatus::Failure { error } => {
            push_line(&mut out, &format!("  Status: FAILED - {}", error));
            push_line(&mut out, RULE);
            return out;
        }
    }

    if !result.balance_changes.is_empty() {
        push_line(&mut out, "");
        push_line(&mut out, "  Balance changes:");
        for change in &result.balance_changes {
            let label = owner_label(&change.owner, ctx);
            let coin = short_coin_type(&change.coin_type);
            push_line(
                &mut out,
                &format!("    {}: {} {}", label, format_mist_signed(change.amount), coin),
            );
        }
    }

    if !result.object_changes.is_empty() {
        push_line(&mut out, "");
        push_line(&mut out, "  Object changes:");
        for change in &result.object_changes {
            push_line(
                &mut out,
                &format!(
                    "    {} {} ({})",
                    change.kind,
                    short_address(&change.object_id),
                    short_coin_type(&change.object_type)
                ),
            );
        }
    }

    if !result.events.is_empty() {
        push_line(&mut out, "");
        push_line(&mut out, "  Events:");
        for event in result.events.iter().take(EVENT_DISPLAY_CAP) {
            push_line(&mut out, &format!("    {}", event.event_type));
        }
        if result.events.len() > EVENT_DISPLAY_CAP {
            push_line(
                &mut out,
                &format!("    +{} more", result.events.len() - EVENT_DISPLAY_CAP),
            );
        }
    }

    push_line(&mut out, "");
    push_line(&mut out, "  Gas estimate:");
    push_line(
        &mut out,
        &format!(
            "    computation:    {} SUI",
            format_mist(i128::from(result.gas.computation_cost))
        ),
    );
    push_line(
        &mut out,
        &format!(
            "    storage:        {} SUI",
            format_mist(i128::from(result.gas.storage_cost))
        ),
    );
    push_line(
        &mut out,
        &format!(
            "    storage rebate: -{} SUI",
            format_mist(i128::from(result.gas.storage_rebate))
        ),
    );
    let gas_total = result.gas.total();
    push_line(
        &mut out,
        &format!("    total:          ~{} SUI", format_mist(gas_total)),
    );

    push_line(&mut out, "");
    push_line(&mut out, "  Summary:");
    push_line(
        &mut out,
        &format!(
            "    sending:       {} SUI",
            format_mist(i128::from(ctx.amount_mist))
        ),
    );
    push_line(
        &mut out,
        &format!("    gas:          ~{} SUI", format_mist(gas_total)),
    );
    push_line(
        &mut out,
        &format!(
            "    total outflow: ~{} SUI",
            format_mist(i128::from(ctx.amount_mist) + gas_total)
        ),
    );
    push_line(&mut out, RULE);
    out
}

/// Render the final on-chain result after a broadcast
pub fn format_execution(summary: &ExecutionSummary, explorer_tx_base: &str) -> String {
    let mut out = String::new();
    push_line(&mut out, RULE);
    match &summary.status {
        SimulationStatus::Success => push_line(&mut out, "  Transfer executed: success"),
        SimulationStatus::Failure { error } => {
            push_line(&mut out, &format!("  Transfer executed: FAILED - {}", error))
        }
    }
    push_line(&mut out, RULE);
    push_line(&mut out, &format!("  Digest:   {}", summary.digest));
    push_line(
        &mut out,
        &format!("  Gas used: {} SUI", format_mist(summary.gas.total())),
    );
    if !summary.balance_changes.is_empty() {
        push_line(&mut out, "  Balance changes:");
        for change in &summary.balance_changes {
            push_line(
                &mut out,
                &format!(
                    "    {}: {} {}",
                    short_address(&change.owner),
                    format_mist_signed(change.amount),
                    short_coin_type(&change.coin_type)
                ),
            );
        }
    }
    push_line(
        &mut out,
        &format!("  Explorer: {}{}", explorer_tx_base, summary.digest),
    );
    push_line(&mut out, RULE);
    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn owner_label(owner: &str, ctx: &PreviewContext<'_>) -> String {
    if owner == ctx.sender {
        "you (sender)".to_string()
    } else if owner == ctx.recipient {
        match ctx.recipient_label {
            Some(domain) => format!("{} (recipient)", domain),
            None => format!("{} (recipient)", short_address(owner)),
        }
    } else {
        short_address(owner)
    }
}

/// Shorten a long hex id for display: `0x1234567890...abcd`
pub fn short_address(address: &str) -> String {
    if address.len() > 16 {
        format!("{}...{}", &address[..10], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

/// Last path segment of a Move type, e.g. `0x2::sui::SUI` -> `SUI`
pub fn short_coin_type(coin_type: &str) -> String {
    match coin_type.rsplit("::").next() {
        Some(short) if !short.is_empty() => short.to_string(),
        _ => coin_type.to_string(),
    }
}

/// Format a signed MIST amount as SUI with up to 9 decimals, trailing
/// zeros trimmed. Pure integer arithmetic.
pub fn format_mist(amount: i128) -> String {
    let mist_per_sui = i128::from(crate::config::MIST_PER_SUI);
    let sign = if amount < 0 { "-" } else { "" };
    let magnitude = amount.unsigned_abs();
    let whole = magnitude / mist_per_sui.unsigned_abs();
    let frac = magnitude % mist_per_sui.unsigned_abs();

    if frac == 0 {
        return format!("{}{}", sign, whole);
    }
    let frac_str = format!("{:09}", frac);
    let trimmed = frac_str.trim_end_matches('0');
    format!("{}{}.{}", sign, whole, trimmed)
}

/// Like `format_mist` but with an explicit `+` on positive deltas
pub fn format_mist_signed(amount: i128) -> String {
    if amount > 0 {
        format!("+{}", format_mist(amount))
    } else {
        format_mist(amount)
    }
}

/// Parse a decimal SUI amount ("0.5") into MIST without floating point.
/// Rejects more than 9 fractional digits rather than silently rounding.
pub fn parse_sui_amount(input: &str) -> crate::Result<u64> {
    let invalid = || crate::Error::InvalidArgument(format!("invalid SUI amount: {}", input));

    let (whole_str, frac_str) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };
    if whole_str.is_empty() && frac_str.is_empty() {
        return Err(invalid());
    }
    if !whole_str.chars().all(|c| c.is_ascii_digit())
        || !frac_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    if frac_str.len() > 9 {
        return Err(crate::Error::InvalidArgument(format!(
            "SUI amounts have at most 9 decimal places (1 MIST): {}",
            input
        )));
    }

    let whole: u64 = if whole_str.is_empty() {
        0
    } else {
        whole_str.parse().map_err(|_| invalid())?
    };
    let frac: u64 = if frac_str.is_empty() {
        0
    } else {
        // Right-pad to 9 digits so "5" means 0.5, not 5 MIST
        format!("{:0<9}", frac_str).parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(crate::config::MIST_PER_SUI)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| crate::Error::InvalidArgument(format!("SUI amount too large: {}", input)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{
        BalanceDelta, EventRecord, GasSummary, ObjectChangeKind, ObjectDelta, SimulationResult,
    };

    fn half_sui_transfer_result() -> SimulationResult {
        SimulationResult {
            status: SimulationStatus::Success,
            balance_changes: vec![
                BalanceDelta {
                    owner: "0xsender".to_string(),
                    coin_type: "0x2::sui::SUI".to_string(),
                    amount: -501_548_000,
                },
                BalanceDelta {
                    owner: "0xabcdef".to_string(),
                    coin_type: "0x2::sui::SUI".to_string(),
                    amount: 500_000_000,
                },
            ],
            object_changes: vec![ObjectDelta {
                kind: ObjectChangeKind::Mutated,
                object_id: "0xc0ffee".to_string(),
                object_type: "0x2::coin::Coin<0x2::sui::SUI>".to_string(),
            }],
            events: vec![],
            gas: GasSummary {
                computation_cost: 550_000,
                storage_cost: 1_976_000,
                storage_rebate: 978_000,
                non_refundable_storage_fee: 0,
            },
        }
    }

    fn ctx<'a>() -> PreviewContext<'a> {
        PreviewContext {
            sender: "0xsender",
            recipient: "0xabcdef",
            recipient_label: Some("friend.sui"),
            amount_mist: 500_000_000,
        }
    }

    #[test]
    fn preview_shows_gas_total_and_labeled_changes() {
        let report = format_preview(&half_sui_transfer_result(), &ctx());
        assert!(report.contains("~0.001548 SUI"), "report was:\n{}", report);
        assert!(report.contains("you (sender): -0.501548 SUI"));
        assert!(report.contains("friend.sui (recipient): +0.5 SUI"));
        assert!(report.contains("total outflow: ~0.501548 SUI"));
    }

    #[test]
    fn preview_is_deterministic() {
        let result = half_sui_transfer_result();
        assert_eq!(
            format_preview(&result, &ctx()),
            format_preview(&result, &ctx())
        );
    }

    #[test]
    fn failed_simulation_shows_error_verbatim_and_stops() {
        let mut result = half_sui_transfer_result();
        result.status = SimulationStatus::Failure {
            error: "InsufficientGas".to_string(),
        };
        let report = format_preview(&result, &ctx());
        assert!(report.contains("FAILED - InsufficientGas"));
        assert!(!report.contains("Summary"));
    }

    #[test]
    fn events_truncate_at_cap_with_trailer() {
        let mut result = half_sui_transfer_result();
        result.events = (0..8)
            .map(|i| EventRecord {
                event_type: format!("0x2::pay::Event{}", i),
                module: "pay".to_string(),
            })
            .collect();
        let report = format_preview(&result, &ctx());
        assert!(report.contains("Event4"));
        assert!(!report.contains("Event5"));
        assert!(report.contains("+3 more"));
    }

    #[test]
    fn format_mist_trims_and_signs() {
        assert_eq!(format_mist(1_548_000), "0.001548");
        assert_eq!(format_mist(1_000_000_000), "1");
        assert_eq!(format_mist(1_500_000_000), "1.5");
        assert_eq!(format_mist(0), "0");
        assert_eq!(format_mist(-501_548_000), "-0.501548");
        assert_eq!(format_mist(1), "0.000000001");
        assert_eq!(format_mist_signed(500_000_000), "+0.5");
        assert_eq!(format_mist_signed(-1), "-0.000000001");
        assert_eq!(format_mist_signed(0), "0");
    }

    #[test]
    fn parse_sui_amount_is_exact() {
        assert_eq!(parse_sui_amount("0.5").unwrap(), 500_000_000);
        assert_eq!(parse_sui_amount("1").unwrap(), 1_000_000_000);
        assert_eq!(parse_sui_amount("0.000000001").unwrap(), 1);
        assert_eq!(parse_sui_amount("10.25").unwrap(), 10_250_000_000);
        assert_eq!(parse_sui_amount(".5").unwrap(), 500_000_000);

        assert!(parse_sui_amount("0.0000000001").is_err());
        assert!(parse_sui_amount("abc").is_err());
        assert!(parse_sui_amount("-1").is_err());
        assert!(parse_sui_amount("").is_err());
        assert!(parse_sui_amount(".").is_err());
        assert!(parse_sui_amount("1.2.3").is_err());
    }

    #[test]
    fn parse_and_format_round_trip() {
        for input in ["0.5", "1", "0.001548", "123.456789012"] {
            let mist = parse_sui_amount(input).unwrap();
            let rendered = format_mist(i128::from(mist));
            assert_eq!(parse_sui_amount(&rendered).unwrap(), mist);
        }
    }

    #[test]
    fn coin_type_shortens_to_last_segment() {
        assert_eq!(short_coin_type("0x2::sui::SUI"), "SUI");
        assert_eq!(short_coin_type("plain"), "plain");
    }
}
