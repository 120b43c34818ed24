//! Grammars for free-text wizard replies

use crate::session::model::{MAX_COMPARTMENT, MAX_PASSENGERS, MIN_COMPARTMENT, MIN_PASSENGERS};

/// Compartments offered by the "any" preset
pub const ANY_COMPARTMENTS: [u8; 9] = [1, 2, 3, 4, 5, 6, 7, 8, 9];

/// Compartments offered by the "not side" preset
pub const NOT_SIDE_COMPARTMENTS: [u8; 6] = [2, 3, 4, 5, 6, 8];

/// Integer in 1..=6
pub fn parse_passenger_count(input: &str) -> Option<u8> {
    input
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|n| (MIN_PASSENGERS..=MAX_PASSENGERS).contains(n))
}

/// Integer in 0..=max
pub fn parse_berth_count(input: &str, max: u8) -> Option<u8> {
    input.trim().parse::<u8>().ok().filter(|n| *n <= max)
}

/// Space separated, unique compartment numbers in 1..=9, at most nine of them
pub fn parse_compartments(input: &str) -> Option<Vec<u8>> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.is_empty() || parts.len() > MAX_COMPARTMENT as usize {
        return None;
    }

    let mut numbers = Vec::with_capacity(parts.len());
    for part in parts {
        let n = part.parse::<u8>().ok()?;
        if !(MIN_COMPARTMENT..=MAX_COMPARTMENT).contains(&n) || numbers.contains(&n) {
            return None;
        }
        numbers.push(n);
    }
    Some(numbers)
}

pub fn format_compartments(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
