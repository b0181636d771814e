use std::collections::BTreeMap;

/// Number of classes the segmentation model is trained on.
pub const NUM_CLASSES: usize = 9;

/// Dental pathology categories, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathologyClass {
    Abrasion,
    Filling,
    Crown,
    CariesClass1,
    CariesClass2,
    CariesClass3,
    CariesClass4,
    CariesClass5,
    CariesClass6,
}

// Display names, indexed by class id.
const NAMES: [&str; NUM_CLASSES] = [
    "Abrasion",
    "Filling",
    "Crown",
    "Caries Class 1",
    "Caries Class 2",
    "Caries Class 3",
    "Caries Class 4",
    "Caries Class 5",
    "Caries Class 6",
];

impl PathologyClass {
    pub const ALL: [PathologyClass; NUM_CLASSES] = [
        PathologyClass::Abrasion,
        PathologyClass::Filling,
        PathologyClass::Crown,
        PathologyClass::CariesClass1,
        PathologyClass::CariesClass2,
        PathologyClass::CariesClass3,
        PathologyClass::CariesClass4,
        PathologyClass::CariesClass5,
        PathologyClass::CariesClass6,
    ];

    pub fn from_id(id: usize) -> Option<Self> {
        Self::ALL.get(id).copied()
    }

    pub fn id(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        NAMES[*self as usize]
    }

    /// The fixed id → name table served by `/api/classes`.
    pub fn table() -> BTreeMap<u8, &'static str> {
        Self::ALL.iter().map(|c| (c.id(), c.name())).collect()
    }
}

impl std::fmt::Display for PathologyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
