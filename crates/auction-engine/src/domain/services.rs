//! Pure pricing functions shared by the bid arbiter and the lifecycle sweep.

use super::entities::{Besitos, Timestamp};

/// Minimum acceptable next bid on an open ascending auction.
pub fn min_acceptable_bid(current_price: Besitos, min_increment: Besitos) -> Besitos {
    current_price.saturating_add(min_increment)
}

/// Maximum acceptable next bid, when the increment is capped.
pub fn max_acceptable_bid(current_price: Besitos, max_increment: Option<Besitos>) -> Option<Besitos> {
    max_increment.map(|max| current_price.saturating_add(max))
}

/// Amount a standing proxy bid is raised to when challenged.
///
/// The raise lands one increment above the challenger, clamped to the
/// ceiling, and never drops below the amount already standing.
pub fn proxy_raise_amount(
    standing_amount: Besitos,
    ceiling: Besitos,
    challenger: Besitos,
    min_increment: Besitos,
) -> Besitos {
    challenger
        .saturating_add(min_increment)
        .min(ceiling)
        .max(standing_amount)
}

/// The descending-clock floor: the reserve price when set, otherwise the
/// minimum increment so the quote never reaches zero.
pub fn dutch_floor(reserve_price: Option<Besitos>, min_increment: Besitos) -> Besitos {
    reserve_price.unwrap_or(min_increment)
}

/// Quoted price of a descending-clock auction at `now`.
///
/// Falls linearly from `starting_price` at `starts_at` to `floor` at
/// `ends_at`, clamped to `[floor, starting_price]`.
pub fn dutch_quote(
    starting_price: Besitos,
    floor: Besitos,
    starts_at: Timestamp,
    ends_at: Timestamp,
    now: Timestamp,
) -> Besitos {
    if now <= starts_at || floor >= starting_price {
        return starting_price;
    }
    if now >= ends_at {
        return floor;
    }
    let span = (ends_at - starts_at) as u128;
    let elapsed = (now - starts_at) as u128;
    let drop = (starting_price - floor) as u128 * elapsed / span;
    starting_price - drop as Besitos
}

/// Whether a bid accepted at `accepted_at` lands inside the anti-sniping
/// window before `ends_at`.
pub fn within_extension_window(
    ends_at: Timestamp,
    accepted_at: Timestamp,
    window_ms: u64,
) -> bool {
    ends_at.saturating_sub(accepted_at) <= window_ms
}

/// New deadline after an extension. Never earlier than the current one.
pub fn extended_deadline(ends_at: Timestamp, accepted_at: Timestamp, window_ms: u64) -> Timestamp {
    ends_at.max(accepted_at.saturating_add(window_ms))
}
