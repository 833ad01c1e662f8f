//! Static index-weight table.
//!
//! Maps constituent short names to their (approximate, constant) index
//! weight in percent. The table is deliberately static: weights drift
//! slowly and a stale weight only skews breadth slightly, whereas a
//! missing weight would silently drop an instrument from every
//! weighted aggregate. Unmapped instruments therefore fall back to
//! [`DEFAULT_WEIGHT`] so they still contribute non-zero mass.

/// Weight assigned to instruments absent from the table.
pub const DEFAULT_WEIGHT: f64 = 0.1;

/// Constituent weights, percent of index.
const WEIGHTS: &[(&str, f64)] = &[
    ("HDFCBANK", 11.07),
    ("RELIANCE", 9.11),
    ("ICICIBANK", 7.89),
    ("INFY", 6.11),
    ("ITC", 4.14),
    ("TCS", 3.92),
    ("LT", 3.88),
    ("BHARTIARTL", 3.43),
    ("AXISBANK", 3.30),
    ("SBIN", 3.09),
    ("KOTAKBANK", 2.94),
    ("M&M", 2.47),
    ("HINDUNILVR", 2.39),
    ("BAJFINANCE", 2.19),
    ("MARUTI", 1.77),
    ("SUNPHARMA", 1.74),
    ("HCLTECH", 1.70),
    ("NTPC", 1.64),
    ("TATAMOTORS", 1.61),
    ("TITAN", 1.48),
    ("POWERGRID", 1.34),
    ("TATASTEEL", 1.33),
    ("ULTRACEMCO", 1.25),
    ("ASIANPAINT", 1.21),
    ("COALINDIA", 1.08),
    ("BAJAJFINSV", 1.04),
    ("NESTLEIND", 0.98),
    ("ADANIENT", 0.96),
    ("GRASIM", 0.90),
    ("ONGC", 0.89),
];

/// Strip exchange suffixes (`RELIANCE-EQ`, `RELIANCE.NS`) and
/// normalize case.
fn short_name(symbol: &str) -> String {
    let base = symbol
        .split_once('-')
        .map(|(head, _)| head)
        .unwrap_or(symbol);
    let base = base.split_once('.').map(|(head, _)| head).unwrap_or(base);
    base.trim().to_ascii_uppercase()
}

/// Resolve an instrument's index weight.
pub fn weight_for(symbol: &str) -> f64 {
    let name = short_name(symbol);

    WEIGHTS
        .iter()
        .find(|(sym, _)| *sym == name)
        .map(|(_, w)| *w)
        .unwrap_or(DEFAULT_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_constituent_resolves() {
        assert_eq!(weight_for("RELIANCE"), 9.11);
    }

    #[test]
    fn exchange_suffixes_are_stripped() {
        assert_eq!(weight_for("RELIANCE-EQ"), 9.11);
        assert_eq!(weight_for("reliance.NS"), 9.11);
    }

    #[test]
    fn unmapped_instrument_gets_default_weight() {
        assert_eq!(weight_for("SOMEMIDCAP"), DEFAULT_WEIGHT);
    }

    #[test]
    fn default_weight_is_non_zero() {
        // Unmapped instruments must still contribute mass to the
        // weighted aggregates instead of being silently excluded.
        assert!(DEFAULT_WEIGHT > 0.0);
    }
}
