//! Materials Project summary records and their text descriptions.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Lattice parameters in Å and angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSpecies {
    pub element: String,
    #[serde(default = "full_occupancy")]
    pub occu: f64,
}

fn full_occupancy() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default)]
    pub species: Vec<SiteSpecies>,
}

impl Site {
    /// `Si` for a fully occupied site, `Fe0.5 Ni0.5` for a mixed one.
    fn species_label(&self) -> String {
        self.species
            .iter()
            .map(|s| {
                if (s.occu - 1.0).abs() < f64::EPSILON {
                    s.element.clone()
                } else {
                    format!("{}{}", s.element, s.occu)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Lowest-energy crystal structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub lattice: Lattice,
    #[serde(default)]
    pub sites: Vec<Site>,
    #[serde(default)]
    pub charge: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moduli {
    pub vrh: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionProduct {
    pub material_id: Option<String>,
    pub formula: Option<String>,
    pub amount: Option<f64>,
}

/// One material's summary document.
///
/// Unknown fields are ignored so full API dumps deserialize as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialSummary {
    pub material_id: String,
    #[serde(default)]
    pub theoretical: bool,
    pub structure: Option<Structure>,

    pub uncorrected_energy_per_atom: Option<f64>,
    pub energy_per_atom: Option<f64>,
    pub formation_energy_per_atom: Option<f64>,
    pub energy_above_hull: Option<f64>,
    pub equilibrium_reaction_energy_per_atom: Option<f64>,
    #[serde(default)]
    pub is_stable: bool,

    pub band_gap: Option<f64>,
    pub is_gap_direct: Option<bool>,
    pub is_metal: Option<bool>,

    pub total_magnetization: Option<f64>,
    pub total_magnetization_normalized_vol: Option<f64>,
    pub num_magnetic_sites: Option<u32>,

    pub bulk_modulus: Option<Moduli>,
    pub shear_modulus: Option<Moduli>,
    pub universal_anisotropy: Option<f64>,

    #[serde(rename = "weighted_surface_energy_EV_PER_ANG2")]
    pub weighted_surface_energy: Option<f64>,
    pub weighted_work_function: Option<f64>,

    #[serde(default)]
    pub possible_species: Vec<String>,
    #[serde(default)]
    pub decomposes_to: Vec<DecompositionProduct>,
}

impl MaterialSummary {
    /// Render the record as one `; `-separated description.
    ///
    /// Property groups with no values are left out entirely.
    pub fn describe(&self) -> String {
        let mut description = vec![format!("Material ID: {}", self.material_id)];

        description.push(if self.theoretical {
            "The material is theoretical".to_string()
        } else {
            "The material is not theoretical".to_string()
        });

        if let Some(structure) = &self.structure {
            description.push(format!("Lowest energy structure: {}", describe_structure(structure)));
        }

        let energy = [
            (self.uncorrected_energy_per_atom, "uncorrected energy per atom", "eV/atom"),
            (self.energy_per_atom, "corrected energy per atom", "eV/atom"),
            (self.formation_energy_per_atom, "formation energy per atom", "eV/atom"),
            (self.energy_above_hull, "energy above hull", "eV/atom"),
            (self.equilibrium_reaction_energy_per_atom, "equilibrium reaction energy", "eV"),
        ];
        push_group(&mut description, "Energy properties", measured(&energy));

        description.push(format!(
            "Stability: {}",
            if self.is_stable { "Stable" } else { "Unstable" }
        ));

        let mut electronic = Vec::new();
        if let Some(gap) = self.band_gap {
            let kind = if self.is_gap_direct.unwrap_or(false) { "direct" } else { "indirect" };
            electronic.push(format!("band gap = {:.3} eV ({})", gap, kind));
        }
        if let Some(metal) = self.is_metal {
            electronic.push(format!(
                "material type = {}",
                if metal { "metallic" } else { "non-metallic" }
            ));
        }
        push_group(&mut description, "Electronic properties", electronic);

        let mut magnetic = measured(&[
            (self.total_magnetization, "total magnetization", "μB"),
            (self.total_magnetization_normalized_vol, "normalized magnetization by volume", "μB/Å³"),
        ]);
        if let Some(count) = self.num_magnetic_sites {
            magnetic.push(format!("magnetic site count = {}", count));
        }
        push_group(&mut description, "Magnetic properties", magnetic);

        let mut mechanical = measured(&[
            (self.bulk_modulus.as_ref().and_then(|m| m.vrh), "bulk modulus (VRH)", "GPa"),
            (self.shear_modulus.as_ref().and_then(|m| m.vrh), "shear modulus (VRH)", "GPa"),
        ]);
        if let Some(anisotropy) = self.universal_anisotropy {
            mechanical.push(format!("universal anisotropy = {:.3}", anisotropy));
        }
        push_group(&mut description, "Mechanical properties", mechanical);

        let surface = measured(&[
            (self.weighted_surface_energy, "surface energy", "eV/Å²"),
            (self.weighted_work_function, "work function", "eV"),
        ]);
        push_group(&mut description, "Surface properties", surface);

        if !self.possible_species.is_empty() {
            description.push(format!(
                "Possible charged species: {}",
                self.possible_species.join(", ")
            ));
        }

        if !self.decomposes_to.is_empty() {
            let products = self
                .decomposes_to
                .iter()
                .map(describe_product)
                .collect::<Vec<_>>()
                .join(", ");
            description.push(format!("Decomposes to: {}", products));
        }

        description.join("; ").trim().to_string()
    }
}

fn measured(values: &[(Option<f64>, &str, &str)]) -> Vec<String> {
    values
        .iter()
        .filter_map(|(value, name, unit)| value.map(|v| format!("{} = {:.3} {}", name, v, unit)))
        .collect()
}

fn push_group(description: &mut Vec<String>, title: &str, items: Vec<String>) {
    if !items.is_empty() {
        description.push(format!("{}: {}", title, items.join(", ")));
    }
}

fn describe_structure(structure: &Structure) -> String {
    let l = &structure.lattice;
    let species = structure
        .sites
        .iter()
        .map(Site::species_label)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(", ");
    let charge = structure
        .charge
        .map(|c| c.to_string())
        .unwrap_or_else(|| "Neutral".to_string());

    format!(
        "lattice parameters: a = {:.2} Å, b = {:.2} Å, and c = {:.2} Å, \
         lattice angles: α={:.2}°, β={:.2}°, γ={:.2}°, \
         Species present: {}, Charge: {}",
        l.a, l.b, l.c, l.alpha, l.beta, l.gamma, species, charge
    )
}

fn describe_product(product: &DecompositionProduct) -> String {
    let mut parts = Vec::new();
    if let Some(id) = product.material_id.as_deref().filter(|s| !s.is_empty()) {
        parts.push(id.to_string());
    }
    if let Some(formula) = product.formula.as_deref().filter(|s| !s.is_empty()) {
        parts.push(formula.to_string());
    }
    if let Some(amount) = product.amount {
        parts.push(format!("(decomposition amount={:.3} formula units)", amount));
    }
    parts.join(" ")
}

/// Parse summaries from a JSON array or from one JSON object per line.
pub fn parse_summaries(text: &str) -> Result<Vec<MaterialSummary>> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                RagError::invalid_input(format!("line {}: {}", n + 1, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn silicon() -> MaterialSummary {
        serde_json::from_value(json!({
            "material_id": "mp-149",
            "theoretical": false,
            "structure": {
                "lattice": {"a": 3.867, "b": 3.867, "c": 3.867, "alpha": 60.0, "beta": 60.0, "gamma": 60.0},
                "sites": [
                    {"species": [{"element": "Si", "occu": 1}]},
                    {"species": [{"element": "Si", "occu": 1}]}
                ],
                "charge": 0
            },
            "energy_above_hull": 0.0,
            "is_stable": true,
            "band_gap": 0.6112,
            "is_gap_direct": false,
            "is_metal": false,
            "bulk_modulus": {"vrh": 88.0},
            "weighted_surface_energy_EV_PER_ANG2": 0.0894,
            "builder_meta": {"ignored": true}
        }))
        .unwrap()
    }

    #[test]
    fn test_describe_silicon() {
        let text = silicon().describe();
        assert!(text.starts_with("Material ID: mp-149; The material is not theoretical; "));
        assert!(text.contains("a = 3.87 Å"));
        assert!(text.contains("Species present: Si, Charge: 0"));
        assert!(text.contains("Energy properties: energy above hull = 0.000 eV/atom"));
        assert!(text.contains("Stability: Stable"));
        assert!(text.contains("Electronic properties: band gap = 0.611 eV (indirect), material type = non-metallic"));
        assert!(text.contains("Mechanical properties: bulk modulus (VRH) = 88.000 GPa"));
        assert!(text.contains("Surface properties: surface energy = 0.089 eV/Å²"));
        assert!(!text.contains("Magnetic properties"));
    }

    #[test]
    fn test_describe_minimal_record() {
        let summary = MaterialSummary {
            material_id: "mp-1".into(),
            theoretical: true,
            decomposes_to: vec![DecompositionProduct {
                material_id: Some("mp-2".into()),
                formula: Some("O2".into()),
                amount: Some(0.5),
            }],
            ..Default::default()
        };
        assert_eq!(
            summary.describe(),
            "Material ID: mp-1; The material is theoretical; Stability: Unstable; \
             Decomposes to: mp-2 O2 (decomposition amount=0.500 formula units)"
        );
    }

    #[test]
    fn test_parse_array_and_lines() {
        let array = r#"[{"material_id": "mp-1"}, {"material_id": "mp-2"}]"#;
        assert_eq!(parse_summaries(array).unwrap().len(), 2);

        let lines = "{\"material_id\": \"mp-1\"}\n\n{\"material_id\": \"mp-2\"}\n";
        let parsed = parse_summaries(lines).unwrap();
        assert_eq!(parsed[1].material_id, "mp-2");

        let err = parse_summaries("{\"material_id\": \"mp-1\"}\nnot json").unwrap_err();
        assert!(matches!(err, RagError::InvalidInput { reason } if reason.starts_with("line 2")));
    }
}
