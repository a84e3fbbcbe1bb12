pub mod config;
pub mod error;
pub mod types;
pub mod urls;

pub use config::Config;
pub use error::RinkwireError;
pub use types::*;

/// Normalize a name into a URL-safe slug: lowercase, strip non-alphanumeric
/// (keeping spaces), collapse whitespace, replace spaces with hyphens.
///
/// ```
/// assert_eq!(rinkwire_common::slugify("Macklin Celebrini"), "macklin-celebrini");
/// assert_eq!(rinkwire_common::slugify("St. Louis!!!"), "st-louis");
/// assert_eq!(rinkwire_common::slugify("  Multiple   Spaces  "), "multiple-spaces");
/// ```
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<&str>>().join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_is_idempotent() {
        let once = slugify("Jean-Gabriel Pageau");
        let twice = slugify(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn slugify_depends_only_on_name() {
        assert_eq!(slugify("Jane Doe"), "jane-doe");
        assert_eq!(slugify("JANE   DOE"), "jane-doe");
    }

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("O'Reilly, Ryan"), "o-reilly-ryan");
    }
}
