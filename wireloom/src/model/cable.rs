//! Cables, bundles, their wires and the connections they carry.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::colors::{color_by_code_index, MultiColor, MAX_WIRE_COLORS};
use super::component::{BomCategory, Component};
use super::connector::join_present;
use super::numbers::NumberAndUnit;
use super::partnumber::{PartNumberInfo, PartNumberList};
use crate::core::HarnessError;

/// Wire id reserved for the shield.
pub const SHIELD_ID: &str = "s";

const AWG_MM2_EQUIVALENTS: &[(&str, &str)] = &[
    ("0.09", "28"),
    ("0.14", "26"),
    ("0.25", "24"),
    ("0.34", "22"),
    ("0.5", "21"),
    ("0.75", "20"),
    ("1", "18"),
    ("1.5", "16"),
    ("2.5", "14"),
    ("4", "12"),
    ("6", "10"),
    ("10", "8"),
    ("16", "6"),
    ("25", "4"),
    ("35", "2"),
    ("50", "1"),
];

const BELDEN_COLORS: &[(&str, &str)] = &[
    ("BN", "001"),
    ("RD", "002"),
    ("OG", "003"),
    ("YE", "004"),
    ("GN", "005"),
    ("TQ", "006"),
    ("VT", "007"),
    ("GY", "008"),
    ("WH", "009"),
    ("BK", "010"),
    ("BG", "011"),
    ("PK", "012"),
    ("BU", "013"),
    ("BKRD", "015"),
    ("BKGN", "016"),
    ("BKYE", "017"),
    ("BKBU", "018"),
    ("BKBN", "019"),
    ("BKOG", "020"),
    ("BKGY", "021"),
    ("BKVT", "022"),
];

/// Belden TFE hook-up wire base MPNs per gauge, preferred first.
const BELDEN_TFE_BASE_MPN: &[(&str, &[&str])] = &[
    ("16 AWG", &["83030", "83010"]),
    ("18 AWG", &["83029", "83009"]),
    ("20 AWG", &["83028", "83027", "83007", "83008"]),
    ("22 AWG", &["83049", "83050", "83025", "83026", "83005", "83006"]),
    ("24 AWG", &["83003", "83004", "83023", "83047", "83048"]),
    ("26 AWG", &["83002", "83046"]),
    ("28 AWG", &["83001", "83045"]),
    ("30 AWG", &["83000", "83043"]),
    ("32 AWG", &["83041"]),
];

const BELDEN_ROLL_LENGTH: u32 = 100;

/// Equivalent AWG of a cross-section in mm².
pub fn awg_equiv(mm2: &NumberAndUnit) -> &'static str {
    let key = mm2.number.to_string();
    AWG_MM2_EQUIVALENTS
        .iter()
        .find(|(m, _)| *m == key)
        .map(|(_, awg)| *awg)
        .unwrap_or("unknown")
}

/// Equivalent cross-section in mm² of an AWG size.
pub fn mm2_equiv(awg: &NumberAndUnit) -> &'static str {
    let key = (awg.number.trunc() as i64).to_string();
    AWG_MM2_EQUIVALENTS
        .iter()
        .find(|(_, a)| *a == key)
        .map(|(mm2, _)| *mm2)
        .unwrap_or("unknown")
}

/// Gauge as displayed: AWG as an integer, `mm2` as `mm²`.
pub fn gauge_str(gauge: &NumberAndUnit) -> String {
    let text = match gauge.unit.as_deref() {
        Some(unit) if unit.eq_ignore_ascii_case("awg") => {
            format!("{} {}", gauge.number.trunc() as i64, unit)
        }
        Some(unit) => format!("{} {}", gauge.number, unit),
        None => gauge.number.to_string(),
    };
    text.replace("mm2", "mm\u{00B2}")
}

/// Gauge with the AWG/mm² equivalent in parentheses when the unit is known.
pub fn gauge_str_with_equiv(gauge: &NumberAndUnit) -> String {
    let equiv = match gauge.unit.as_deref() {
        Some("mm2") => format!(" ({} AWG)", awg_equiv(gauge)),
        Some(unit) if unit.eq_ignore_ascii_case("awg") => format!(" ({} mm2)", mm2_equiv(gauge)),
        _ => String::new(),
    };
    format!("{}{}", gauge_str(gauge), equiv).replace("mm2", "mm\u{00B2}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CableCategory {
    Cable,
    Bundle,
}

impl CableCategory {
    pub fn parse(designator: &str, category: Option<&str>) -> Result<Self, HarnessError> {
        let Some(category) = category else {
            return Ok(CableCategory::Cable);
        };
        match category.parse::<BomCategory>()? {
            BomCategory::Cable => Ok(CableCategory::Cable),
            BomCategory::Bundle => Ok(CableCategory::Bundle),
            other => Err(HarnessError::InvalidDefinition {
                designator: designator.to_string(),
                reason: format!("category {:?} is not valid for a cable", other),
            }),
        }
    }
}

/// A part field given either once for the whole cable or per wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartField {
    One(String),
    Many(Vec<String>),
}

impl PartField {
    fn for_wire(&self, index: usize) -> String {
        match self {
            PartField::One(value) => value.clone(),
            PartField::Many(values) => values.get(index).cloned().unwrap_or_default(),
        }
    }
}

/// Part number fields of a cable; lists are only allowed for bundles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CablePartFields {
    #[serde(default)]
    pub pn: Option<PartField>,
    #[serde(default)]
    pub manufacturer: Option<PartField>,
    #[serde(default)]
    pub mpn: Option<PartField>,
    #[serde(default)]
    pub supplier: Option<PartField>,
    #[serde(default)]
    pub spn: Option<PartField>,
}

impl CablePartFields {
    fn fields(&self) -> [&Option<PartField>; 5] {
        [&self.pn, &self.manufacturer, &self.mpn, &self.supplier, &self.spn]
    }

    fn for_wire(&self, index: usize) -> PartNumberInfo {
        let get = |f: &Option<PartField>| f.as_ref().map(|f| f.for_wire(index)).unwrap_or_default();
        PartNumberInfo::new(
            get(&self.pn),
            get(&self.manufacturer),
            get(&self.mpn),
            get(&self.supplier),
            get(&self.spn),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShieldSpec {
    None,
    Plain,
    Colored(String),
}

impl Default for ShieldSpec {
    fn default() -> Self {
        ShieldSpec::None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wire {
    /// Zero-based position in the cable; the shield comes last.
    pub index: usize,
    pub id: String,
    pub label: Option<String>,
    pub color: MultiColor,
    pub gauge: Option<NumberAndUnit>,
    pub length: Option<NumberAndUnit>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub subtype: Option<String>,
    pub partnumbers: PartNumberInfo,
    pub is_shield: bool,
    /// Designator of the owning cable.
    pub parent: String,
}

impl Wire {
    /// Port name on the cable node: `w<n>`, or `ws` for the shield.
    pub fn port(&self) -> String {
        if self.is_shield {
            format!("w{}", SHIELD_ID)
        } else {
            format!("w{}", self.index + 1)
        }
    }

    pub fn gauge_str(&self) -> Option<String> {
        self.gauge.as_ref().map(gauge_str)
    }

    /// `<id>:<color>:<label>`; the id is omitted in bundles and for the shield.
    pub fn wireinfo(&self, parent_is_bundle: bool) -> String {
        let mut info = Vec::new();
        if !parent_is_bundle && !self.is_shield {
            info.push(self.id.clone());
        }
        if !self.color.is_empty() {
            info.push(self.color.to_string());
        }
        if let Some(label) = &self.label {
            info.push(label.clone());
        }
        info.join(":")
    }

    /// BOM description: `Wire, <type>, <subtype>, <gauge>, <color>`.
    pub fn description(&self) -> String {
        let head = if self.is_shield { "Shield" } else { "Wire" };
        let color = (!self.color.is_empty()).then(|| self.color.to_string());
        join_present([
            Some(head.to_string()),
            self.type_.clone(),
            self.subtype.clone(),
            self.gauge_str(),
            color,
        ])
    }

    pub fn is_belden(&self) -> bool {
        self.partnumbers.manufacturer.to_lowercase().contains("belden")
    }

    /// Fill in a Belden TFE MPN derived from gauge and color when the
    /// manufacturer is Belden and no MPN was given.
    pub fn apply_belden_autofill(&mut self) -> Result<(), HarnessError> {
        if !self.is_belden() || !self.partnumbers.mpn.is_empty() {
            return Ok(());
        }
        let gauge = self.gauge_str().unwrap_or_default();
        let bases = BELDEN_TFE_BASE_MPN
            .iter()
            .find(|(g, _)| *g == gauge)
            .map(|(_, mpns)| *mpns)
            .ok_or_else(|| HarnessError::InvalidDefinition {
                designator: format!("{}:{}", self.parent, self.id),
                reason: format!("no Belden TFE wire for gauge '{}'", gauge),
            })?;
        let color_key = self.color.to_string();
        let color = match BELDEN_COLORS.iter().find(|(c, _)| *c == color_key) {
            Some((_, code)) => *code,
            None => {
                tracing::warn!(
                    "{}:{}: color '{}' has no Belden equivalent, defaulting to BK",
                    self.parent,
                    self.id,
                    color_key
                );
                "010"
            }
        };
        let mpns: Vec<String> = bases
            .iter()
            .map(|base| format!("{} {}{}", base, color, BELDEN_ROLL_LENGTH))
            .collect();
        if mpns.len() > 1 {
            tracing::debug!(
                "alternate parts for {}:{}: {:?}",
                self.parent,
                self.id,
                &mpns[1..]
            );
        }
        self.partnumbers.mpn = mpns[0].clone();
        Ok(())
    }
}

/// Reference to a resolved connector pin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRef {
    pub designator: String,
    pub index: usize,
    pub id: String,
    pub label: Option<String>,
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.designator, self.id)?;
        if let Some(label) = &self.label {
            write!(f, ":{}", label)?;
        }
        Ok(())
    }
}

/// Reference to a resolved wire (or shield) of a cable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRef {
    pub cable: String,
    pub index: usize,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: Option<PinRef>,
    pub via: WireRef,
    pub to: Option<PinRef>,
}

impl Connection {
    pub fn endpoint_count(&self) -> usize {
        usize::from(self.from.is_some()) + usize::from(self.to.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cable {
    pub designator: String,
    pub category: CableCategory,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub subtype: Option<String>,
    pub gauge: Option<NumberAndUnit>,
    pub length: Option<NumberAndUnit>,
    pub color: MultiColor,
    pub color_code: Option<String>,
    /// Wires in id order, followed by the shield if any.
    pub wires: Vec<Wire>,
    /// Cable-level identity; for bundles the fields shared by every wire.
    pub partnumbers: PartNumberInfo,
    pub qty: NumberAndUnit,
    pub ignore_in_bom: bool,
    pub additional_components: Vec<Component>,
    pub show_name: bool,
    pub show_equiv: bool,
    pub show_wirecount: bool,
    pub connections: Vec<Connection>,
}

/// Everything needed to build a [`Cable`]; filled from the input schema.
#[derive(Debug, Clone, Default)]
pub struct CableSpec {
    pub type_: Option<String>,
    pub subtype: Option<String>,
    pub category: Option<String>,
    pub gauge: Option<NumberAndUnit>,
    pub length: Option<NumberAndUnit>,
    pub color: Option<String>,
    pub color_code: Option<String>,
    pub wirecount: Option<usize>,
    pub colors: Vec<String>,
    pub wirelabels: Vec<String>,
    pub shield: ShieldSpec,
    pub partnumbers: CablePartFields,
    pub qty: Option<NumberAndUnit>,
    pub ignore_in_bom: bool,
    pub additional_components: Vec<Component>,
    pub show_name: Option<bool>,
    pub show_equiv: bool,
    pub show_wirecount: Option<bool>,
}

impl Cable {
    pub fn new(designator: impl Into<String>, spec: CableSpec) -> Result<Self, HarnessError> {
        let designator = designator.into();
        let invalid = |reason: String| HarnessError::InvalidDefinition {
            designator: designator.clone(),
            reason,
        };

        let category = CableCategory::parse(&designator, spec.category.as_deref())?;
        let cable_color = MultiColor::parse(spec.color.as_deref())?;

        let colors: Vec<String> = match spec.wirecount.filter(|&n| n > 0) {
            Some(wirecount) if !spec.colors.is_empty() => (0..wirecount)
                .map(|i| spec.colors[i % spec.colors.len()].clone())
                .collect(),
            Some(wirecount) => match &spec.color_code {
                Some(code) => (0..wirecount)
                    .map(|i| color_by_code_index(code, i).map(str::to_string))
                    .collect::<Result<_, _>>()?,
                None => (0..wirecount)
                    .map(|i| {
                        cable_color
                            .cycled(i)
                            .map(|c| c.to_string())
                            .unwrap_or_default()
                    })
                    .collect(),
            },
            None if spec.colors.is_empty() => {
                return Err(invalid(
                    "unknown number of wires; specify wirecount or colors".to_string(),
                ))
            }
            None => spec.colors.clone(),
        };
        let wirecount = colors.len();

        if spec.wirelabels.len() > wirecount {
            return Err(invalid("more wire labels than wires".to_string()));
        }
        if spec.shield != ShieldSpec::None && spec.wirelabels.iter().any(|l| l == SHIELD_ID) {
            return Err(invalid(
                "\"s\" may not be used as a wire label for a shielded cable".to_string(),
            ));
        }
        for field in spec.partnumbers.fields().into_iter().flatten() {
            if let PartField::Many(values) = field {
                if category != CableCategory::Bundle {
                    return Err(invalid(
                        "lists of part data are only supported for bundles".to_string(),
                    ));
                }
                if values.len() != wirecount {
                    return Err(invalid(format!(
                        "lists of part data must match wirecount ({} != {})",
                        values.len(),
                        wirecount
                    )));
                }
            }
        }

        let mut wires = Vec::with_capacity(wirecount + 1);
        for (index, color) in colors.iter().enumerate() {
            let color = MultiColor::parse(Some(color))?;
            if color.len() > MAX_WIRE_COLORS {
                return Err(invalid(format!(
                    "wire {} has more than {} colors",
                    index + 1,
                    MAX_WIRE_COLORS
                )));
            }
            let mut wire = Wire {
                index,
                id: (index + 1).to_string(),
                label: spec.wirelabels.get(index).filter(|l| !l.is_empty()).cloned(),
                color,
                gauge: spec.gauge.clone(),
                length: spec.length.clone(),
                type_: spec.type_.clone(),
                subtype: spec.subtype.clone(),
                partnumbers: spec.partnumbers.for_wire(index),
                is_shield: false,
                parent: designator.clone(),
            };
            if category == CableCategory::Bundle {
                wire.apply_belden_autofill()?;
            }
            wires.push(wire);
        }

        let shield_color = match &spec.shield {
            ShieldSpec::None => None,
            ShieldSpec::Plain => Some(MultiColor::default()),
            ShieldSpec::Colored(color) => Some(MultiColor::parse(Some(color))?),
        };
        if let Some(color) = shield_color {
            wires.push(Wire {
                index: wirecount,
                id: SHIELD_ID.to_string(),
                label: Some("Shield".to_string()),
                color,
                gauge: None,
                length: spec.length.clone(),
                type_: None,
                subtype: None,
                partnumbers: PartNumberInfo::default(),
                is_shield: true,
                parent: designator.clone(),
            });
        }

        let partnumbers = match category {
            CableCategory::Cable => spec.partnumbers.for_wire(0),
            CableCategory::Bundle => PartNumberList(
                wires
                    .iter()
                    .filter(|w| !w.is_shield)
                    .map(|w| w.partnumbers.clone())
                    .collect(),
            )
            .folded(),
        };

        Ok(Cable {
            category,
            type_: spec.type_,
            subtype: spec.subtype,
            gauge: spec.gauge,
            length: spec.length,
            color: cable_color,
            color_code: spec.color_code,
            wires,
            partnumbers,
            qty: spec.qty.unwrap_or_else(|| NumberAndUnit::unitless(1.0)),
            ignore_in_bom: spec.ignore_in_bom,
            additional_components: spec.additional_components,
            show_name: spec.show_name.unwrap_or(true),
            show_equiv: spec.show_equiv,
            show_wirecount: spec.show_wirecount.unwrap_or(true),
            connections: Vec::new(),
            designator,
        })
    }

    pub fn is_bundle(&self) -> bool {
        self.category == CableCategory::Bundle
    }

    /// Conductors excluding the shield.
    pub fn conductors(&self) -> impl Iterator<Item = &Wire> {
        self.wires.iter().filter(|w| !w.is_shield)
    }

    pub fn wirecount(&self) -> usize {
        self.conductors().count()
    }

    pub fn shield(&self) -> Option<&Wire> {
        self.wires.iter().find(|w| w.is_shield)
    }

    pub fn is_shielded(&self) -> bool {
        self.shield().is_some()
    }

    pub fn wire(&self, index: usize) -> Option<&Wire> {
        self.wires.get(index)
    }

    /// Per-wire identities of a bundle.
    pub fn partnumber_list(&self) -> PartNumberList {
        PartNumberList(self.conductors().map(|w| w.partnumbers.clone()).collect())
    }

    pub fn add_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    /// Pins feeding wire `index` from the left.
    pub fn wire_ins(&self, index: usize) -> Vec<&PinRef> {
        self.connections
            .iter()
            .filter(|c| c.via.index == index)
            .filter_map(|c| c.from.as_ref())
            .collect()
    }

    /// Pins fed by wire `index` on the right.
    pub fn wire_outs(&self, index: usize) -> Vec<&PinRef> {
        self.connections
            .iter()
            .filter(|c| c.via.index == index)
            .filter_map(|c| c.to.as_ref())
            .collect()
    }

    /// Non-null connection endpoints across all wires.
    pub fn terminations(&self) -> usize {
        self.connections.iter().map(Connection::endpoint_count).sum()
    }

    /// Sum of conductor lengths, shield excluded.
    pub fn total_length(&self) -> f64 {
        self.conductors()
            .map(|w| w.length.as_ref().map_or(0.0, |l| l.number))
            .sum()
    }

    pub fn gauge_str(&self) -> Option<String> {
        self.gauge.as_ref().map(gauge_str)
    }

    /// BOM description, e.g. `Cable, 4 x 0.25 mm² shielded, BK`.
    pub fn description(&self) -> String {
        let mut desc = String::from("Cable");
        for part in [&self.type_, &self.subtype].into_iter().flatten() {
            if !part.is_empty() {
                desc.push_str(", ");
                desc.push_str(part);
            }
        }
        desc.push_str(&format!(", {}", self.wirecount()));
        match self.gauge_str() {
            Some(gauge) => desc.push_str(&format!(" x {}", gauge)),
            None => desc.push_str(" wires"),
        }
        if self.is_shielded() {
            desc.push_str(" shielded");
        }
        if !self.color.is_empty() {
            desc.push_str(&format!(", {}", self.color));
        }
        desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors(list: &[&str]) -> CableSpec {
        CableSpec {
            colors: list.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_wirecount_implied_by_colors() {
        let cable = Cable::new("W1", colors(&["RD", "BK", "GNYE"])).unwrap();
        assert_eq!(cable.wirecount(), 3);
        assert_eq!(cable.wires[2].id, "3");
        assert_eq!(cable.wires[2].color.len(), 2);
    }

    #[test]
    fn test_wirecount_required() {
        assert!(matches!(
            Cable::new("W1", CableSpec::default()),
            Err(HarnessError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_colors_cycle_and_color_code() {
        let mut spec = colors(&["RD", "BK"]);
        spec.wirecount = Some(5);
        let cable = Cable::new("W1", spec).unwrap();
        assert_eq!(cable.wires[4].color.to_string(), "RD");

        let spec = CableSpec {
            wirecount: Some(3),
            color_code: Some("IEC".into()),
            ..Default::default()
        };
        let cable = Cable::new("W2", spec).unwrap();
        assert_eq!(cable.wires[2].color.to_string(), "OG");
    }

    #[test]
    fn test_shield_is_last() {
        let mut spec = colors(&["RD", "BK"]);
        spec.shield = ShieldSpec::Colored("CU".into());
        let cable = Cable::new("W1", spec).unwrap();
        let shield = cable.shield().unwrap();
        assert_eq!(shield.index, 2);
        assert_eq!(shield.port(), "ws");
        assert_eq!(cable.wirecount(), 2);

        let mut spec = colors(&["RD"]);
        spec.shield = ShieldSpec::Plain;
        spec.wirelabels = vec!["s".into()];
        assert!(Cable::new("W1", spec).is_err());
    }

    #[test]
    fn test_part_lists_only_for_bundles() {
        let mut spec = colors(&["RD", "BK"]);
        spec.partnumbers.mpn = Some(PartField::Many(vec!["A".into(), "B".into()]));
        assert!(Cable::new("W1", spec.clone()).is_err());

        spec.category = Some("bundle".into());
        let bundle = Cable::new("W1", spec.clone()).unwrap();
        assert_eq!(bundle.wires[1].partnumbers.mpn, "B");

        spec.partnumbers.mpn = Some(PartField::Many(vec!["A".into()]));
        assert!(Cable::new("W1", spec).is_err());
    }

    #[test]
    fn test_description() {
        let mut spec = colors(&["RD", "BK", "WH", "GN"]);
        spec.gauge = Some(NumberAndUnit::new(0.25, Some("mm2")));
        spec.shield = ShieldSpec::Plain;
        spec.color = Some("GY".into());
        let cable = Cable::new("W1", spec).unwrap();
        assert_eq!(cable.description(), "Cable, 4 x 0.25 mm\u{00B2} shielded, GY");

        let cable = Cable::new("W2", colors(&["RD"])).unwrap();
        assert_eq!(cable.description(), "Cable, 1 wires");
    }

    #[test]
    fn test_gauge_strings() {
        let awg = NumberAndUnit::new(24.0, Some("AWG"));
        assert_eq!(gauge_str(&awg), "24 AWG");
        assert_eq!(gauge_str_with_equiv(&awg), "24 AWG (0.25 mm\u{00B2})");
        let mm2 = NumberAndUnit::new(0.5, Some("mm2"));
        assert_eq!(gauge_str_with_equiv(&mm2), "0.5 mm\u{00B2} (21 AWG)");
    }

    #[test]
    fn test_belden_autofill() {
        let spec = CableSpec {
            category: Some("bundle".into()),
            colors: vec!["RD".into(), "BKRD".into()],
            gauge: Some(NumberAndUnit::new(22.0, Some("AWG"))),
            partnumbers: CablePartFields {
                manufacturer: Some(PartField::One("Belden".into())),
                ..Default::default()
            },
            ..Default::default()
        };
        let bundle = Cable::new("W1", spec).unwrap();
        assert_eq!(bundle.wires[0].partnumbers.mpn, "83049 002100");
        assert_eq!(bundle.wires[1].partnumbers.mpn, "83049 015100");
        assert_eq!(bundle.partnumbers.manufacturer, "Belden");
        assert_eq!(bundle.partnumbers.mpn, "");
    }
}
