//! The fixed attribute taxonomy stored for every material record.

use serde::{Deserialize, Serialize};

/// Categories of information present in every indexed material description.
///
/// The relevance classifier chooses from these when deciding whether the
/// knowledge base can answer a question at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeCategory {
    MaterialId,
    Theoretical,
    Structural,
    Energy,
    Stability,
    Electronic,
    Magnetic,
    Mechanical,
    Surface,
    PossibleSpecies,
    Decomposition,
}

impl AttributeCategory {
    /// Every category, in prompt order.
    pub const ALL: [AttributeCategory; 11] = [
        AttributeCategory::MaterialId,
        AttributeCategory::Theoretical,
        AttributeCategory::Structural,
        AttributeCategory::Energy,
        AttributeCategory::Stability,
        AttributeCategory::Electronic,
        AttributeCategory::Magnetic,
        AttributeCategory::Mechanical,
        AttributeCategory::Surface,
        AttributeCategory::PossibleSpecies,
        AttributeCategory::Decomposition,
    ];

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MaterialId => "Material ID",
            Self::Theoretical => "Whether the material is theoretical",
            Self::Structural => "Structural properties",
            Self::Energy => "Energy properties",
            Self::Stability => "Stability",
            Self::Electronic => "Electronic properties",
            Self::Magnetic => "Magnetic properties",
            Self::Mechanical => "Mechanical properties",
            Self::Surface => "Surface properties",
            Self::PossibleSpecies => "Possible charged species",
            Self::Decomposition => "Decomposition information",
        }
    }

    /// Example properties that fall under this category.
    pub fn examples(&self) -> &'static str {
        match self {
            Self::MaterialId => "e.g., mp-149",
            Self::Theoretical => "theoretical or experimentally observed",
            Self::Structural => "lattice parameters, angles, species present, charge",
            Self::Energy => "energy per atom, formation energy, energy above the hull",
            Self::Stability => "stable/unstable",
            Self::Electronic => {
                "band gap, whether the band gap is direct or indirect, metallic or non-metallic"
            }
            Self::Magnetic => {
                "total magnetization, normalized magnetization by volume, magnetic site count"
            }
            Self::Mechanical => "bulk modulus (VRH), shear modulus (VRH), universal anisotropy",
            Self::Surface => "surface energy, work function",
            Self::PossibleSpecies => "ions",
            Self::Decomposition => "decomposition to other materials, decomposition amounts",
        }
    }

    /// Numbered listing of the whole taxonomy for prompts.
    pub fn listing() -> String {
        Self::ALL
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. **{}** ({})", i + 1, c.label(), c.examples()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Display for AttributeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
