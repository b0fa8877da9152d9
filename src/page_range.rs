use std::num::IntErrorKind;

use thiserror::Error;

/// Why a page specification was rejected. Each variant carries the token
/// that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("only one dash allowed in the range: {0}")]
    MalformedRange(String),
    #[error("range can't begin or end with a dash: {0}")]
    DashOnBoundary(String),
    #[error("page number must be integer: {0}")]
    NotAnInteger(String),
    #[error("start page can't be greater than the final: {0}")]
    RangeReversed(String),
    #[error("page out of range: {0}")]
    OutOfRange(String),
}

/// Bounds are kept wider than a page number so that oversized numbers still
/// reach the bounds check in [`PageRange::expand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u64,
    pub end: u64,
}

impl PageRange {
    /// Parse one token of a page specification: "7" or "20-22"
    pub fn parse(token: &str) -> Result<Self, RangeError> {
        let token = token.trim();

        match token.matches('-').count() {
            0 => {
                let page = parse_page(token, token)?;
                Ok(PageRange {
                    start: page,
                    end: page,
                })
            }
            1 => {
                // A leading dash also covers negative numbers like "-1"
                if token.starts_with('-') || token.ends_with('-') {
                    return Err(RangeError::DashOnBoundary(token.to_string()));
                }

                let (start, end) = token
                    .split_once('-')
                    .ok_or_else(|| RangeError::MalformedRange(token.to_string()))?;
                let start = parse_page(start, token)?;
                let end = parse_page(end, token)?;

                if start > end {
                    return Err(RangeError::RangeReversed(token.to_string()));
                }

                Ok(PageRange { start, end })
            }
            _ => Err(RangeError::MalformedRange(token.to_string())),
        }
    }

    /// Expand into 1-based page numbers, checking both bounds against the document
    pub fn expand(&self, total_pages: u32) -> Result<Vec<u32>, RangeError> {
        if self.start == 0 || self.end > u64::from(total_pages) {
            let token = if self.start == self.end {
                self.start.to_string()
            } else {
                format!("{}-{}", self.start, self.end)
            };
            return Err(RangeError::OutOfRange(token));
        }

        // Both bounds fit in a u32 once they are within the document
        Ok((self.start as u32..=self.end as u32).collect())
    }
}

fn parse_page(s: &str, token: &str) -> Result<u64, RangeError> {
    match s.trim().parse::<u64>() {
        Ok(page) => Ok(page),
        // Still an integer, just larger than any document
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Ok(u64::MAX),
        Err(_) => Err(RangeError::NotAnInteger(token.to_string())),
    }
}

/// Resolve a page specification like "2,4,10,20-22,50" into a sorted,
/// deduplicated list of 1-based page numbers.
///
/// Tokens are validated left to right and the first bad one rejects the whole
/// specification. An empty specification is rejected as well: callers that
/// want every page pass `1..=total_pages` themselves.
pub fn resolve(spec: &str, total_pages: u32) -> Result<Vec<u32>, RangeError> {
    let mut pages = Vec::new();
    for token in spec.split(',') {
        let range = PageRange::parse(token)?;
        pages.extend(range.expand(total_pages)?);
    }

    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

/// Every page of a document, for when no specification was given
pub fn all_pages(total_pages: u32) -> Vec<u32> {
    (1..=total_pages).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_consecutive_pages() {
        assert_eq!(resolve("1,2,3,4", 100).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_page_range() {
        assert_eq!(resolve("17-20", 100).unwrap(), vec![17, 18, 19, 20]);
    }

    #[test]
    fn test_single_page_range() {
        assert_eq!(resolve("25-25", 100).unwrap(), vec![25]);
        assert_eq!(PageRange::parse("25-25").unwrap(), PageRange::parse("25").unwrap());
    }

    #[test]
    fn test_mixed_with_spaces() {
        assert_eq!(
            resolve("2, 4, 10, 20-22, 50", 100).unwrap(),
            vec![2, 4, 10, 20, 21, 22, 50]
        );
        assert_eq!(
            resolve("2, 4, 10, 20-22, 50, 65-67", 100).unwrap(),
            vec![2, 4, 10, 20, 21, 22, 50, 65, 66, 67]
        );
    }

    #[test]
    fn test_spaces_inside_range() {
        assert_eq!(resolve(" 3 - 5 ", 10).unwrap(), vec![3, 4, 5]);
    }

    #[test]
    fn test_duplicates_collapsed() {
        assert_eq!(
            resolve("2,3,4,4,5,7-10, 9-10, 15, 15", 100).unwrap(),
            vec![2, 3, 4, 5, 7, 8, 9, 10, 15]
        );
    }

    #[test]
    fn test_output_sorted_regardless_of_input_order() {
        assert_eq!(resolve("9, 3-4, 1", 10).unwrap(), vec![1, 3, 4, 9]);
    }

    #[test]
    fn test_output_strictly_ascending() {
        for spec in ["5,4,3,2,1", "1-10,2-9,3", "7,7,7", "10-10,1-1"] {
            let pages = resolve(spec, 10).unwrap();
            assert!(pages.windows(2).all(|w| w[0] < w[1]), "{spec}: {pages:?}");
        }
    }

    #[test]
    fn test_reversed_range() {
        assert!(matches!(resolve("10-5", 100), Err(RangeError::RangeReversed(_))));
    }

    #[test]
    fn test_zero_out_of_range() {
        assert!(matches!(resolve("0-5", 100), Err(RangeError::OutOfRange(_))));
        assert!(matches!(resolve("0", 100), Err(RangeError::OutOfRange(_))));
    }

    #[test]
    fn test_page_exceeds_total() {
        assert!(matches!(resolve("15", 10), Err(RangeError::OutOfRange(_))));
        assert!(matches!(resolve("8-11", 10), Err(RangeError::OutOfRange(_))));
    }

    #[test]
    fn test_huge_page_numbers_out_of_range() {
        assert_eq!(
            resolve("99999999999", 100),
            Err(RangeError::OutOfRange("99999999999".to_string()))
        );
        assert_eq!(
            resolve("1-99999999999", 100),
            Err(RangeError::OutOfRange("1-99999999999".to_string()))
        );
        assert!(matches!(
            resolve("123456789012345678901234567890", 100),
            Err(RangeError::OutOfRange(_))
        ));
        assert!(matches!(
            resolve("99999999999-5", 100),
            Err(RangeError::RangeReversed(_))
        ));
    }

    #[test]
    fn test_negative_page_is_dash_on_boundary() {
        assert!(matches!(resolve("-1", 100), Err(RangeError::DashOnBoundary(_))));
    }

    #[test]
    fn test_dash_on_boundary() {
        for spec in ["2, 4, 10, -20, 50", "2, 4, 10, 22-, 50", "2, 4, 10-, 20-22, 50"] {
            assert!(
                matches!(resolve(spec, 100), Err(RangeError::DashOnBoundary(_))),
                "{spec}"
            );
        }
    }

    #[test]
    fn test_not_an_integer() {
        assert!(matches!(resolve("1, qw, 24", 100), Err(RangeError::NotAnInteger(_))));
        assert!(matches!(resolve("1-b", 100), Err(RangeError::NotAnInteger(_))));
        assert!(matches!(resolve("1,,2", 100), Err(RangeError::NotAnInteger(_))));
    }

    #[test]
    fn test_empty_spec_rejected() {
        assert!(matches!(resolve("", 100), Err(RangeError::NotAnInteger(_))));
    }

    #[test]
    fn test_double_dash() {
        assert_eq!(
            resolve("2, 4, 10, 20--22, 50", 100),
            Err(RangeError::MalformedRange("20--22".to_string()))
        );
        assert!(matches!(resolve("20--22", 100), Err(RangeError::MalformedRange(_))));
    }

    #[test]
    fn test_first_bad_token_wins() {
        // The out-of-range token comes before the malformed one
        assert!(matches!(resolve("500, 1--2", 100), Err(RangeError::OutOfRange(_))));
        assert!(matches!(resolve("1--2, 500", 100), Err(RangeError::MalformedRange(_))));
    }

    #[test]
    fn test_reversed_checked_before_bounds() {
        assert!(matches!(resolve("200-150", 100), Err(RangeError::RangeReversed(_))));
    }

    #[test]
    fn test_all_pages() {
        assert_eq!(all_pages(3), vec![1, 2, 3]);
        assert!(all_pages(0).is_empty());
    }
}
