//! Charset name to Windows code page identifiers.
//!
//! Used to switch the console code page with `chcp` before running the
//! compiler so its output arrives in the charset the log is decoded with.

/// Known charset names and their Windows code page.
const CODE_PAGES: &[(&str, u32)] = &[
    ("utf-8", 65001),
    ("ibm437", 437),
    ("ibm850", 850),
    ("ibm852", 852),
    ("shift_jis", 932),
    ("windows-31j", 932),
    ("us-ascii", 20127),
    ("euc-jp", 20932),
    ("iso-8859-1", 28591),
    ("iso-8859-2", 28592),
    ("IBM00858", 858),
    ("IBM775", 775),
    ("IBM855", 855),
    ("IBM857", 857),
    ("ISO-8859-4", 28594),
    ("ISO-8859-5", 28595),
    ("ISO-8859-7", 28597),
    ("ISO-8859-9", 28599),
    ("ISO-8859-13", 28603),
    ("ISO-8859-15", 28605),
    ("KOI8-R", 20866),
    ("KOI8-U", 21866),
    ("UTF-16", 1200),
    ("UTF-32", 12000),
    ("UTF-32BE", 12001),
    ("windows-1250", 1250),
    ("windows-1251", 1251),
    ("windows-1252", 1252),
    ("windows-1253", 1253),
    ("windows-1254", 1254),
    ("windows-1257", 1257),
    ("Big5", 950),
    ("EUC-KR", 51949),
    ("GB18030", 54936),
    ("GB2312", 936),
    ("IBM-Thai", 20838),
    ("IBM01140", 1140),
    ("IBM01141", 1141),
    ("IBM01142", 1142),
    ("IBM01143", 1143),
    ("IBM01144", 1144),
    ("IBM01145", 1145),
    ("IBM01146", 1146),
    ("IBM01147", 1147),
    ("IBM01148", 1148),
    ("IBM01149", 1149),
    ("IBM037", 37),
    ("IBM1026", 1026),
    ("IBM273", 20273),
    ("IBM277", 20277),
    ("IBM278", 20278),
    ("IBM280", 20280),
    ("IBM284", 20284),
    ("IBM285", 20285),
    ("IBM297", 20297),
    ("IBM420", 20420),
    ("IBM424", 20424),
    ("IBM500", 500),
    ("IBM860", 860),
    ("IBM861", 861),
    ("IBM863", 863),
    ("IBM864", 864),
    ("IBM865", 865),
    ("IBM869", 869),
    ("IBM870", 870),
    ("IBM871", 20871),
    ("ISO-2022-JP", 50220),
    ("ISO-2022-KR", 50225),
    ("ISO-8859-3", 28593),
    ("ISO-8859-6", 28596),
    ("ISO-8859-8", 28598),
    ("windows-1255", 1255),
    ("windows-1256", 1256),
    ("windows-1258", 1258),
];

/// Look up the Windows code page for a charset name, ignoring case.
///
/// Returns `0` for unknown names, meaning no code page switch is needed.
#[must_use]
pub fn code_page_for(charset: &str) -> u32 {
    CODE_PAGES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(charset))
        .map_or(0, |&(_, code_page)| code_page)
}
