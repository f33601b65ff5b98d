use crate::cutout::CutoutKind;

/// Names of the flat pixel extensions holding each cutout kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionNames {
    pub image: String,
    pub weight: String,
    pub seg: String,
}

impl ExtensionNames {
    /// Extension that stores pixels of the given kind.
    pub fn name(&self, kind: CutoutKind) -> &str {
        match kind {
            CutoutKind::Image => &self.image,
            CutoutKind::Weight => &self.weight,
            CutoutKind::Seg => &self.seg,
        }
    }
}

impl Default for ExtensionNames {
    fn default() -> Self {
        Self {
            image: "image_cutouts".to_string(),
            weight: "weight_cutouts".to_string(),
            seg: "seg_cutouts".to_string(),
        }
    }
}

/// Configuration for a [`Meds`](crate::Meds) accessor.
#[derive(Debug, Clone, Default)]
pub struct MedsConfig {
    /// Lookup table from cutout kind to extension name.
    pub extensions: ExtensionNames,
}
