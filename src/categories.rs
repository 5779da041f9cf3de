/// An inquiry classification offered on the start menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    /// Callback data carried by the menu button
    pub key: &'static str,
    /// Human-readable label shown on the button and in the admin header
    pub label: &'static str,
}

/// Menu entries, in display order.
pub static CATEGORIES: [Category; 4] = [
    Category {
        key: "admissions",
        label: "Admissions inquiry",
    },
    Category {
        key: "exams",
        label: "Exams inquiry",
    },
    Category {
        key: "jobs",
        label: "Jobs inquiry",
    },
    Category {
        key: "other",
        label: "Other topic",
    },
];

/// Resolve callback data to its category.
pub fn find(key: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.key == key)
}
