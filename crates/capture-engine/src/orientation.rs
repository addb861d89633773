//! Preview orientation, applied by `videoflip`.

use std::fmt;
use std::str::FromStr;

use lightbox_common::error::LightboxError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    #[default]
    None,
    Clockwise,
    Rotate180,
    Counterclockwise,
    HorizontalFlip,
    VerticalFlip,
    UpperLeftDiagonal,
    UpperRightDiagonal,
}

impl Orientation {
    pub const ALL: [Orientation; 8] = [
        Orientation::None,
        Orientation::Clockwise,
        Orientation::Rotate180,
        Orientation::Counterclockwise,
        Orientation::HorizontalFlip,
        Orientation::VerticalFlip,
        Orientation::UpperLeftDiagonal,
        Orientation::UpperRightDiagonal,
    ];

    /// `videoflip` `video-direction` nick.
    pub fn nick(&self) -> &'static str {
        match self {
            Orientation::None => "identity",
            Orientation::Clockwise => "90r",
            Orientation::Rotate180 => "180",
            Orientation::Counterclockwise => "90l",
            Orientation::HorizontalFlip => "horiz",
            Orientation::VerticalFlip => "vert",
            Orientation::UpperLeftDiagonal => "ul-lr",
            Orientation::UpperRightDiagonal => "ur-ll",
        }
    }

    /// Name used in configuration and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Orientation::None => "none",
            Orientation::Clockwise => "clockwise",
            Orientation::Rotate180 => "rotate-180",
            Orientation::Counterclockwise => "counterclockwise",
            Orientation::HorizontalFlip => "horizontal-flip",
            Orientation::VerticalFlip => "vertical-flip",
            Orientation::UpperLeftDiagonal => "upper-left-diagonal",
            Orientation::UpperRightDiagonal => "upper-right-diagonal",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Orientation {
    type Err = LightboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Orientation::ALL
            .into_iter()
            .find(|o| o.name() == s || o.nick() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Orientation::ALL.iter().map(Orientation::name).collect();
                LightboxError::config(format!(
                    "Unknown orientation {s:?}. Expected one of: {}",
                    names.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_nicks() {
        assert_eq!("rotate-180".parse::<Orientation>().unwrap(), Orientation::Rotate180);
        assert_eq!("90l".parse::<Orientation>().unwrap(), Orientation::Counterclockwise);
        assert!("sideways".parse::<Orientation>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for orientation in Orientation::ALL {
            assert_eq!(orientation.to_string().parse::<Orientation>().unwrap(), orientation);
        }
    }
}
