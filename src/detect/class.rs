//! Region classification: class id to semantic label and overlay color.

use image::Rgb;

pub const COLOR_HELMET: Rgb<u8> = Rgb([0, 255, 0]);
pub const COLOR_LICENSE_PLATE: Rgb<u8> = Rgb([0, 0, 255]);
pub const COLOR_NO_HELMET: Rgb<u8> = Rgb([255, 0, 0]);

/// Semantic class of a detected region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Helmet,
    LicensePlate,
    NoHelmet,
}

impl ObjectClass {
    /// Cast a numeric class id. Any id other than 0 or 1 maps to `NoHelmet`;
    /// the catch-all is intentional, not an error path.
    pub fn from_class_id(class_id: i64) -> Self {
        match class_id {
            0 => ObjectClass::Helmet,
            1 => ObjectClass::LicensePlate,
            _ => ObjectClass::NoHelmet,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ObjectClass::Helmet => "Helmet",
            ObjectClass::LicensePlate => "License Plate",
            ObjectClass::NoHelmet => "No Helmet",
        }
    }

    pub fn color(&self) -> Rgb<u8> {
        match self {
            ObjectClass::Helmet => COLOR_HELMET,
            ObjectClass::LicensePlate => COLOR_LICENSE_PLATE,
            ObjectClass::NoHelmet => COLOR_NO_HELMET,
        }
    }
}

/// Label for a license-plate detection with its recognized text. The colon is
/// kept even when no text was recognized.
pub fn plate_label(recognized_text: &str) -> String {
    format!("License Plate: {}", recognized_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_id_cast_is_total() {
        assert_eq!(ObjectClass::from_class_id(0), ObjectClass::Helmet);
        assert_eq!(ObjectClass::from_class_id(1), ObjectClass::LicensePlate);
        assert_eq!(ObjectClass::from_class_id(2), ObjectClass::NoHelmet);
        assert_eq!(ObjectClass::from_class_id(-3), ObjectClass::NoHelmet);
        assert_eq!(ObjectClass::from_class_id(99), ObjectClass::NoHelmet);
    }

    #[test]
    fn classification_is_pure_and_stable() {
        for _ in 0..3 {
            assert_eq!(ObjectClass::Helmet.label(), "Helmet");
            assert_eq!(ObjectClass::Helmet.color(), COLOR_HELMET);
            assert_eq!(ObjectClass::LicensePlate.label(), "License Plate");
            assert_eq!(ObjectClass::LicensePlate.color(), COLOR_LICENSE_PLATE);
            assert_eq!(ObjectClass::NoHelmet.label(), "No Helmet");
            assert_eq!(ObjectClass::NoHelmet.color(), COLOR_NO_HELMET);
        }
    }

    #[test]
    fn plate_label_keeps_trailing_colon_when_empty() {
        assert_eq!(plate_label(""), "License Plate: ");
        assert_eq!(plate_label("ABC123"), "License Plate: ABC123");
    }
}
