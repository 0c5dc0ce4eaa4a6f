//! Selectable regions and the category partitions used for the `"all"` region.

/// Region code meaning "load by category partitions instead of one region
/// document".
pub const ALL_REGIONS: &str = "all";

/// Category partitions fetched when the region is [`ALL_REGIONS`], in fetch
/// order.
pub const CATEGORY_PARTITIONS: &[&str] = &[
    "news",
    "movies",
    "music",
    "kids",
    "entertainment",
    "sports",
];

/// Region code → display label.  Codes are the lower-case partition names of
/// the upstream `countries/` documents.
pub const REGIONS: &[(&str, &str)] = &[
    (ALL_REGIONS, "All Countries"),
    ("ar", "Argentina"),
    ("au", "Australia"),
    ("at", "Austria"),
    ("be", "Belgium"),
    ("br", "Brazil"),
    ("ca", "Canada"),
    ("cl", "Chile"),
    ("cn", "China"),
    ("co", "Colombia"),
    ("cz", "Czech Republic"),
    ("dk", "Denmark"),
    ("eg", "Egypt"),
    ("fi", "Finland"),
    ("fr", "France"),
    ("de", "Germany"),
    ("gr", "Greece"),
    ("hu", "Hungary"),
    ("in", "India"),
    ("id", "Indonesia"),
    ("ie", "Ireland"),
    ("il", "Israel"),
    ("it", "Italy"),
    ("jp", "Japan"),
    ("kr", "South Korea"),
    ("mx", "Mexico"),
    ("nl", "Netherlands"),
    ("no", "Norway"),
    ("pe", "Peru"),
    ("ph", "Philippines"),
    ("pl", "Poland"),
    ("pt", "Portugal"),
    ("ro", "Romania"),
    ("ru", "Russia"),
    ("sa", "Saudi Arabia"),
    ("es", "Spain"),
    ("se", "Sweden"),
    ("ch", "Switzerland"),
    ("tr", "Turkey"),
    ("ua", "Ukraine"),
    ("ae", "United Arab Emirates"),
    ("uk", "United Kingdom"),
    ("us", "United States"),
];

pub fn regions() -> &'static [(&'static str, &'static str)] {
    REGIONS
}

/// Display label for a region code, case-insensitive.
pub fn region_label(code: &str) -> Option<&'static str> {
    REGIONS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, label)| *label)
}

pub fn is_known_region(code: &str) -> bool {
    region_label(code).is_some()
}
