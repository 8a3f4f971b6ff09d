use crate::error::{Error, Result};
use core::fmt;

const MULTI_RANGE_USAGE: &str = "Excluded ranges must be given as a space-separated sequence of \
                                 ranges between square brackets, e.g. '[1,1000] [2001,3000]'";
const SINGLE_RANGE_USAGE: &str =
    "Excluded range must be given as a range between square brackets, e.g. '[1,1000]'";

/// A closed interval `[low, high]` of identifier values that must never be
/// allocated, typically reserved for previously assigned legacy keys.
///
/// Ranges are expressed in *final* (bit-reversed) value space: they are
/// matched against the value that would be handed to the application, not
/// against the raw counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExcludedRange {
    low: i64,
    high: i64,
}

impl ExcludedRange {
    /// Callers must uphold `low <= high`; the parser enforces it.
    pub(crate) const fn new(low: i64, high: i64) -> Self {
        Self { low, high }
    }

    /// Lower bound, inclusive.
    pub const fn low(&self) -> i64 {
        self.low
    }

    /// Upper bound, inclusive.
    pub const fn high(&self) -> i64 {
        self.high
    }

    /// Whether `value` falls inside the interval, both bounds included.
    pub const fn contains(&self, value: i64) -> bool {
        self.low <= value && value <= self.high
    }
}

impl fmt::Display for ExcludedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.low, self.high)
    }
}

/// An immutable set of [`ExcludedRange`]s belonging to one logical sequence.
///
/// Membership testing is linear in the number of ranges; overlapping ranges
/// are kept as given and never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExcludedRanges {
    ranges: Vec<ExcludedRange>,
}

impl ExcludedRanges {
    /// Parses a space-separated list of `[low,high]` tokens.
    ///
    /// This is the multi-range form used by the non-pooled allocator's
    /// `exclude_ranges` parameter. An empty or all-whitespace `spec` yields
    /// an empty set. Any malformed token is a fatal configuration error; the
    /// diagnostic names the sequence, the structural or numeric cause, and
    /// echoes the offending token.
    ///
    /// # Example
    /// ```
    /// use scatterseq::ExcludedRanges;
    ///
    /// let ranges = ExcludedRanges::parse("customer_id", "[1,1000] [2001,3000]").unwrap();
    /// assert!(ranges.contains(1000));
    /// assert!(!ranges.contains(1500));
    /// ```
    pub fn parse(sequence_name: &str, spec: &str) -> Result<Self> {
        let mut ranges = Vec::new();
        for token in spec.split_whitespace() {
            ranges.push(parse_token(sequence_name, token, MULTI_RANGE_USAGE)?);
        }
        Ok(Self { ranges })
    }

    /// Parses at most one `[low,high]` token.
    ///
    /// This is the single-range form used by the pooled allocator's
    /// `exclude_range` parameter. The whole trimmed `spec` is treated as one
    /// token, so a space-separated list is rejected rather than silently
    /// truncated.
    pub fn parse_single(sequence_name: &str, spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            ranges: vec![parse_token(sequence_name, spec, SINGLE_RANGE_USAGE)?],
        })
    }

    /// Appends another set's ranges after this one's, preserving order.
    pub fn concat(mut self, other: Self) -> Self {
        self.ranges.extend(other.ranges);
        self
    }

    /// Whether `value` falls within any of the parsed ranges.
    pub fn contains(&self, value: i64) -> bool {
        self.ranges.iter().any(|range| range.contains(value))
    }

    /// The parsed ranges, in input order.
    pub fn ranges(&self) -> &[ExcludedRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Renders the skip-range options covering every excluded range, for
    /// consumption by a DDL layer that creates the backing sequence.
    ///
    /// Returns `None` when the set is empty. The rendered span is the
    /// envelope of all ranges, so disjoint ranges widen it.
    pub fn skip_range_options(&self) -> Option<String> {
        let min = self.ranges.iter().map(ExcludedRange::low).min()?;
        let max = self.ranges.iter().map(ExcludedRange::high).max()?;
        Some(format!("skip_range_min={min}, skip_range_max={max}"))
    }
}

fn invalid_range(sequence_name: &str, token: &str, usage: &str, cause: impl fmt::Display) -> Error {
    Error::Configuration(format!(
        "Invalid range found for the [{sequence_name}] sequence: {cause}\n{usage}. Found '{token}'"
    ))
}

fn parse_token(sequence_name: &str, token: &str, usage: &str) -> Result<ExcludedRange> {
    let token = token.trim();
    let Some(inner) = token
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        return Err(invalid_range(
            sequence_name,
            token,
            usage,
            "Range is not enclosed between '[' and ']'",
        ));
    };
    let bounds: Vec<&str> = inner.split(',').collect();
    if bounds.len() != 2 {
        return Err(invalid_range(
            sequence_name,
            token,
            usage,
            "Range does not contain exactly two elements",
        ));
    }
    let low = bounds[0]
        .parse::<i64>()
        .map_err(|err| invalid_range(sequence_name, token, usage, err))?;
    let high = bounds[1]
        .parse::<i64>()
        .map_err(|err| invalid_range(sequence_name, token, usage, err))?;
    if low > high {
        return Err(invalid_range(
            sequence_name,
            token,
            usage,
            format_args!("Invalid range: [{low}..{high}]"),
        ));
    }
    Ok(ExcludedRange::new(low, high))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configuration_message(result: Result<ExcludedRanges>) -> String {
        match result {
            Err(Error::Configuration(message)) => message,
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    fn multi_error(sequence_name: &str, cause: &str, token: &str) -> String {
        format!(
            "Invalid range found for the [{sequence_name}] sequence: {cause}\n{MULTI_RANGE_USAGE}. \
             Found '{token}'"
        )
    }

    #[test]
    fn parses_empty_spec_to_empty_set() {
        assert!(ExcludedRanges::parse("test_sequence", "").unwrap().is_empty());
        assert!(ExcludedRanges::parse("test_sequence", "   ").unwrap().is_empty());
        assert!(
            ExcludedRanges::parse_single("test_sequence", "")
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn parses_single_and_multiple_ranges() {
        assert_eq!(
            ExcludedRanges::parse("test_sequence", "[1,1]").unwrap().ranges(),
            &[ExcludedRange::new(1, 1)]
        );
        assert_eq!(
            ExcludedRanges::parse("test_sequence", "[1,1000]").unwrap().ranges(),
            &[ExcludedRange::new(1, 1000)]
        );
        assert_eq!(
            ExcludedRanges::parse("test_sequence", "[-2000,-1000]")
                .unwrap()
                .ranges(),
            &[ExcludedRange::new(-2000, -1000)]
        );
        assert_eq!(
            ExcludedRanges::parse("test_sequence", "[1,10] [20,30]")
                .unwrap()
                .ranges(),
            &[ExcludedRange::new(1, 10), ExcludedRange::new(20, 30)]
        );
        assert_eq!(
            ExcludedRanges::parse("test_sequence", "[1,10] [20,30] [-30,-20]")
                .unwrap()
                .ranges(),
            &[
                ExcludedRange::new(1, 10),
                ExcludedRange::new(20, 30),
                ExcludedRange::new(-30, -20)
            ]
        );
    }

    #[test]
    fn rejects_non_numeric_bound() {
        let cause = "foo".parse::<i64>().unwrap_err().to_string();
        assert_eq!(
            configuration_message(ExcludedRanges::parse("test_sequence", "[foo,-2000]")),
            multi_error("test_sequence", &cause, "[foo,-2000]")
        );
    }

    #[test]
    fn rejects_empty_bound() {
        let cause = "".parse::<i64>().unwrap_err().to_string();
        assert_eq!(
            configuration_message(ExcludedRanges::parse("test_sequence", "[,1000]")),
            multi_error("test_sequence", &cause, "[,1000]")
        );
    }

    #[test]
    fn rejects_wrong_element_count() {
        assert_eq!(
            configuration_message(ExcludedRanges::parse("test_sequence", "[1,1000][2000,3000]")),
            multi_error(
                "test_sequence",
                "Range does not contain exactly two elements",
                "[1,1000][2000,3000]"
            )
        );
    }

    #[test]
    fn rejects_missing_brackets() {
        assert_eq!(
            configuration_message(ExcludedRanges::parse("test_sequence", "1,1000 2000,3000")),
            multi_error(
                "test_sequence",
                "Range is not enclosed between '[' and ']'",
                "1,1000"
            )
        );
    }

    #[test]
    fn rejects_inverted_bounds() {
        assert_eq!(
            configuration_message(ExcludedRanges::parse("test_sequence", "[-1000,-2000]")),
            multi_error(
                "test_sequence",
                "Invalid range: [-1000..-2000]",
                "[-1000,-2000]"
            )
        );
    }

    #[test]
    fn single_form_rejects_multiple_tokens() {
        let message =
            configuration_message(ExcludedRanges::parse_single("test_sequence", "[1,10] [20,30]"));
        assert_eq!(
            message,
            format!(
                "Invalid range found for the [test_sequence] sequence: Range does not contain \
                 exactly two elements\n{SINGLE_RANGE_USAGE}. Found '[1,10] [20,30]'"
            )
        );
    }

    #[test]
    fn single_form_parses_one_token() {
        assert_eq!(
            ExcludedRanges::parse_single("test_sequence", " [1,1000] ")
                .unwrap()
                .ranges(),
            &[ExcludedRange::new(1, 1000)]
        );
    }

    #[test]
    fn membership_is_inclusive_of_both_bounds() {
        let ranges = ExcludedRanges::parse("test_sequence", "[1,10] [20,30]").unwrap();
        assert!(ranges.contains(1));
        assert!(ranges.contains(10));
        assert!(ranges.contains(20));
        assert!(ranges.contains(30));
        assert!(!ranges.contains(0));
        assert!(!ranges.contains(11));
        assert!(!ranges.contains(19));
        assert!(!ranges.contains(31));
        assert!(!ExcludedRanges::default().contains(0));
    }

    #[test]
    fn skip_range_options_cover_the_envelope() {
        assert_eq!(ExcludedRanges::default().skip_range_options(), None);
        assert_eq!(
            ExcludedRanges::parse("test_sequence", "[1,1000]")
                .unwrap()
                .skip_range_options()
                .as_deref(),
            Some("skip_range_min=1, skip_range_max=1000")
        );
        assert_eq!(
            ExcludedRanges::parse("test_sequence", "[20,30] [1,10]")
                .unwrap()
                .skip_range_options()
                .as_deref(),
            Some("skip_range_min=1, skip_range_max=30")
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let ranges = ExcludedRanges::parse("test_sequence", "[1,10] [20,30]").unwrap();
        let json = serde_json::to_string(&ranges).unwrap();
        let back: ExcludedRanges = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ranges);
    }
}
