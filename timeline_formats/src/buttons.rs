/// The fixed mapping from a button's short label to its bit flag within the 16-bit N64
/// controller button field, shared by both movie formats.
pub(crate) const BUTTON_FLAGS: &[(&str, u16)] = &[
    ("A", 0x8000),
    ("B", 0x4000),
    ("Z", 0x2000),
    ("S", 0x1000),
    ("Du", 0x0800),
    ("Dd", 0x0400),
    ("Dl", 0x0200),
    ("Dr", 0x0100),
    ("L", 0x0020),
    ("R", 0x0010),
    ("Cu", 0x0008),
    ("Cd", 0x0004),
    ("Cl", 0x0002),
    ("Cr", 0x0001),
];

/// Look up a button's bit flag by its short label, case-insensitively.
pub(crate) fn flag_for_label(label: &str) -> Option<u16> {
    BUTTON_FLAGS
        .iter()
        .find(|(l, _)| l.eq_ignore_ascii_case(label))
        .map(|(_, flag)| *flag)
}

/// Look up a button's short label by its bit flag.
pub(crate) fn label_for_flag(flag: u16) -> Option<&'static str> {
    BUTTON_FLAGS.iter().find(|(_, f)| *f == flag).map(|(l, _)| *l)
}
