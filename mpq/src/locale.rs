//! Locale codes stored in hash table entries (Windows LANGIDs)

/// Language-neutral / default
pub const NEUTRAL: u16 = 0x0000;
/// Chinese (Taiwan)
pub const CHINESE: u16 = 0x0404;
/// Czech
pub const CZECH: u16 = 0x0405;
/// German
pub const GERMAN: u16 = 0x0407;
/// English (US)
pub const ENGLISH: u16 = 0x0409;
/// Spanish
pub const SPANISH: u16 = 0x040A;
/// French
pub const FRENCH: u16 = 0x040C;
/// Italian
pub const ITALIAN: u16 = 0x0410;
/// Japanese
pub const JAPANESE: u16 = 0x0411;
/// Korean
pub const KOREAN: u16 = 0x0412;
/// Dutch
pub const DUTCH: u16 = 0x0413;
/// Polish
pub const POLISH: u16 = 0x0415;
/// Portuguese
pub const PORTUGUESE: u16 = 0x0416;
/// Russian
pub const RUSSIAN: u16 = 0x0419;
/// English (UK)
pub const ENGLISH_UK: u16 = 0x0809;

/// Human readable name for a locale code
pub fn name(locale: u16) -> Option<&'static str> {
    let name = match locale {
        NEUTRAL => "Neutral",
        CHINESE => "Chinese",
        CZECH => "Czech",
        GERMAN => "German",
        ENGLISH => "English (US)",
        SPANISH => "Spanish",
        FRENCH => "French",
        ITALIAN => "Italian",
        JAPANESE => "Japanese",
        KOREAN => "Korean",
        DUTCH => "Dutch",
        POLISH => "Polish",
        PORTUGUESE => "Portuguese",
        RUSSIAN => "Russian",
        ENGLISH_UK => "English (UK)",
        _ => return None,
    };
    Some(name)
}
