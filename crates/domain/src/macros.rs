//! Macro for implementing Display and FromStr for label enums
//!
//! Several domain enums have a fixed textual form that appears in log
//! lines and configuration files. This macro keeps the two directions of
//! that mapping in one place.
//!
//! # Example
//!
//! ```rust
//! use recur_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Mode {
//!     Streaming,
//!     Buffered,
//! }
//!
//! impl_label_conversions!(Mode {
//!     Streaming => "streaming",
//!     Buffered => "buffered",
//! });
//!
//! assert_eq!(Mode::Streaming.to_string(), "streaming");
//! assert_eq!("BUFFERED".parse::<Mode>(), Ok(Mode::Buffered));
//! ```

/// Implements `Display` and case-insensitive `FromStr` for a label enum
///
/// Labels must be written in lowercase; parsing lowercases and trims its
/// input before matching. Parse errors name the enum and the rejected input.
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $label:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical label for this variant
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($label => ::std::result::Result::Ok(Self::$variant),)+
                    _ => ::std::result::Result::Err(::std::format!(
                        "Invalid {}: {}",
                        stringify!($enum_name),
                        s
                    )),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Outcome {
        Passed,
        TimedOut,
    }

    impl_label_conversions!(Outcome {
        Passed => "passed",
        TimedOut => "timed out",
    });

    #[test]
    fn test_display_conversion() {
        assert_eq!(Outcome::Passed.to_string(), "passed");
        assert_eq!(Outcome::TimedOut.to_string(), "timed out");
    }

    #[test]
    fn test_fromstr_ignores_case_and_padding() {
        assert_eq!(Outcome::from_str("PASSED").unwrap(), Outcome::Passed);
        assert_eq!(Outcome::from_str("  Timed Out ").unwrap(), Outcome::TimedOut);
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = Outcome::from_str("skipped");
        assert!(result.unwrap_err().contains("Invalid Outcome: skipped"));
        assert!(Outcome::from_str("").is_err());
    }

    mod with_result_alias {
        use std::str::FromStr;

        // Shadows the prelude `Result` the way config.rs does
        #[allow(unused_imports)]
        use crate::errors::Result;

        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Channel {
            Stable,
            Nightly,
        }

        impl_label_conversions!(Channel {
            Stable => "stable",
            Nightly => "nightly",
        });

        #[test]
        fn test_expands_beside_single_argument_result() {
            assert_eq!(Channel::from_str("Nightly"), Ok(Channel::Nightly));
            assert_eq!(Channel::Stable.to_string(), "stable");
            assert!(Channel::from_str("beta").is_err());
        }
    }
}
