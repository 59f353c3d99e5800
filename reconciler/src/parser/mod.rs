//! Delimited-line parsing and roster loading.
//!
//! [`parse_line`] splits one comma-separated line into fields; [`roster`]
//! builds a validated [`crate::models::Roster`] from a whole file.

pub mod roster;

pub use roster::{load, load_str};

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// Split one line into fields.
///
/// A double quote opens a quoted section in which commas are literal and a
/// doubled quote stands for one quote character. A quoted section left open
/// closes at the end of the line. Never fails and always yields at least one
/// field.
///
/// # Example
/// ```
/// use roster_reconciler::parser::parse_line;
///
/// let fields = parse_line(r#"alpha,"bravo, charlie","d""e""#);
/// assert_eq!(fields, vec!["alpha", "bravo, charlie", "d\"e"]);
/// ```
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == QUOTE {
                if chars.peek() == Some(&QUOTE) {
                    current.push(QUOTE);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == QUOTE {
            in_quotes = true;
        } else if c == DELIMITER {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }

    fields.push(current);
    fields
}
