//! Rendering geometry derived from the structure of generated diagram text.
//!
//! The C4 geometry is produced by a fixed pipeline over an immutable baseline:
//!
//! 1. [`element_tier`] *replaces* margins, box size and message font based on
//!    the number of people and systems,
//! 2. [`relationship_pass`] *adds* margin and spacing for busy diagrams,
//! 3. [`label_pass`] *adds* margin (and may shrink the message font) when
//!    relationship labels run long.
//!
//! Each stage takes a [`C4Geometry`] by value and returns a new one, so the
//! order of replace and add steps stays visible at the call site in
//! [`compute_layout`].

use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DiagramKind {
    /// No diagram text; the default configuration applies.
    Empty,
    /// Directional graph (`graph LR`, `flowchart TD`, ...).
    Flowchart,
    /// C4 context/container diagram. Any other non-empty text lands here too.
    C4,
}

/// Spacing for directional graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowchartGeometry {
    pub node_spacing: u32,
    pub rank_spacing: u32,
    pub padding: u32,
    pub diagram_padding: u32,
}

impl FlowchartGeometry {
    pub const DEFAULT: Self = Self {
        node_spacing: 100,
        rank_spacing: 120,
        padding: 40,
        diagram_padding: 20,
    };
}

/// Margins, box size and message typography for C4 diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct C4Geometry {
    pub diagram_margin_x: u32,
    pub diagram_margin_y: u32,
    pub shape_margin: u32,
    pub shape_padding: u32,
    pub box_width: u32,
    pub box_height: u32,
    pub box_margin: u32,
    pub message_font_size: u32,
}

impl C4Geometry {
    pub const BASELINE: Self = Self {
        diagram_margin_x: 200,
        diagram_margin_y: 150,
        shape_margin: 250,
        shape_padding: 60,
        box_width: 450,
        box_height: 200,
        box_margin: 80,
        message_font_size: 14,
    };
}

pub const MIN_MESSAGE_FONT_SIZE: u32 = 12;
const ELEMENT_FONT_SIZE: u32 = 17;
const FONT_FAMILY: &str = "Arial, sans-serif";

/// Geometry and typography handed to the renderer for one diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub kind: DiagramKind,
    pub font_size: u32,
    pub theme_font_size: u32,
    pub flowchart: FlowchartGeometry,
    pub c4: C4Geometry,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            kind: DiagramKind::Empty,
            font_size: 16,
            theme_font_size: 16,
            flowchart: FlowchartGeometry::DEFAULT,
            c4: C4Geometry::BASELINE,
        }
    }
}

impl LayoutConfig {
    fn flowchart() -> Self {
        Self {
            kind: DiagramKind::Flowchart,
            ..Self::default()
        }
    }

    fn c4(c4: C4Geometry) -> Self {
        Self {
            kind: DiagramKind::C4,
            theme_font_size: ELEMENT_FONT_SIZE,
            c4,
            ..Self::default()
        }
    }

    /// Mermaid-style initialization object for the external renderer.
    ///
    /// Flowcharts get a width-constrained flowchart section only; C4 diagrams
    /// get the full `c4` section; the empty default carries both.
    pub fn to_renderer_config(&self) -> serde_json::Value {
        let fc = &self.flowchart;
        let mut config = json!({
            "startOnLoad": true,
            "theme": "default",
            "securityLevel": "loose",
            "fontSize": self.font_size,
            "themeVariables": {
                "fontSize": format!("{}px", self.theme_font_size),
                "fontFamily": FONT_FAMILY,
            },
        });

        config["flowchart"] = match self.kind {
            DiagramKind::C4 => json!({
                "useMaxWidth": false,
                "htmlLabels": true,
                "curve": "basis",
                "padding": fc.padding,
            }),
            DiagramKind::Flowchart | DiagramKind::Empty => json!({
                "useMaxWidth": true,
                "htmlLabels": true,
                "curve": "basis",
                "nodeSpacing": fc.node_spacing,
                "rankSpacing": fc.rank_spacing,
                "padding": fc.padding,
                "diagramPadding": fc.diagram_padding,
            }),
        };

        if self.kind != DiagramKind::Flowchart {
            let c4 = &self.c4;
            config["c4"] = json!({
                "diagramMarginX": c4.diagram_margin_x,
                "diagramMarginY": c4.diagram_margin_y,
                "c4ShapeMargin": c4.shape_margin,
                "c4ShapePadding": c4.shape_padding,
                "width": c4.box_width,
                "height": c4.box_height,
                "boxMargin": c4.box_margin,
                "personFontSize": ELEMENT_FONT_SIZE,
                "personFontFamily": FONT_FAMILY,
                "personFontWeight": "bold",
                "external_personFontSize": ELEMENT_FONT_SIZE,
                "systemFontSize": ELEMENT_FONT_SIZE,
                "systemFontFamily": FONT_FAMILY,
                "systemFontWeight": "bold",
                "external_systemFontSize": ELEMENT_FONT_SIZE,
                "messageFontSize": c4.message_font_size,
                "messageFontFamily": FONT_FAMILY,
                "wrap": true,
                "wrapPadding": 15,
            });
        }

        config
    }
}

/// Structural counts of a C4 diagram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagramStats {
    pub actors: usize,
    pub systems: usize,
    pub external_systems: usize,
    pub relationships: usize,
    /// Mean character length of quoted relationship labels, 0 when there are none.
    pub mean_label_length: f64,
}

impl DiagramStats {
    pub fn collect(text: &str) -> Self {
        let labels: Vec<usize> = rel_label_regex()
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().chars().count())
            .collect();
        let mean_label_length = labels.iter().sum::<usize>() as f64 / labels.len().max(1) as f64;

        Self {
            actors: text.matches("Person(").count(),
            systems: text.matches("System(").count(),
            external_systems: text.matches("System_Ext(").count(),
            relationships: text.matches("Rel(").count(),
            mean_label_length,
        }
    }

    pub fn total_elements(&self) -> usize {
        self.actors + self.systems + self.external_systems
    }
}

fn rel_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"Rel\([^,]+,[^,]+,\s*"([^"]+)""#).expect("valid regex"))
}

fn flowchart_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:graph|flowchart)\s+(?:LR|RL|TD|TB|BT)\b").expect("valid regex"))
}

pub fn detect_kind(text: &str) -> DiagramKind {
    if text.trim().is_empty() {
        DiagramKind::Empty
    } else if flowchart_regex().is_match(text) {
        DiagramKind::Flowchart
    } else {
        DiagramKind::C4
    }
}

/// Replace margins, box size and message font according to the element count.
pub fn element_tier(base: C4Geometry, total_elements: usize) -> C4Geometry {
    let (shape_margin, margin_x, margin_y, box_margin, font, width, height) = match total_elements {
        n if n > 6 => (350, 280, 200, 100, 13, 480, 220),
        n if n > 4 => (300, 240, 180, 90, 14, 460, 210),
        n if n > 2 => (270, 220, 160, 85, 14, 450, 200),
        _ => {
            let b = C4Geometry::BASELINE;
            (
                b.shape_margin,
                b.diagram_margin_x,
                b.diagram_margin_y,
                b.box_margin,
                b.message_font_size,
                b.box_width,
                b.box_height,
            )
        }
    };
    C4Geometry {
        diagram_margin_x: margin_x,
        diagram_margin_y: margin_y,
        shape_margin,
        box_width: width,
        box_height: height,
        box_margin,
        message_font_size: font,
        ..base
    }
}

/// Add margin and spacing for diagrams with many relationships.
pub fn relationship_pass(geometry: C4Geometry, relationships: usize) -> C4Geometry {
    let (shape, x, y) = match relationships {
        n if n > 6 => (100, 80, 60),
        n if n > 4 => (50, 40, 30),
        _ => return geometry,
    };
    C4Geometry {
        shape_margin: geometry.shape_margin + shape,
        diagram_margin_x: geometry.diagram_margin_x + x,
        diagram_margin_y: geometry.diagram_margin_y + y,
        ..geometry
    }
}

/// Add shape margin for long relationship labels; very long labels also
/// shrink the message font by one step.
pub fn label_pass(geometry: C4Geometry, mean_label_length: f64) -> C4Geometry {
    if mean_label_length > 25.0 {
        C4Geometry {
            shape_margin: geometry.shape_margin + 80,
            message_font_size: geometry
                .message_font_size
                .saturating_sub(1)
                .max(MIN_MESSAGE_FONT_SIZE),
            ..geometry
        }
    } else if mean_label_length > 15.0 {
        C4Geometry {
            shape_margin: geometry.shape_margin + 40,
            ..geometry
        }
    } else {
        geometry
    }
}

/// Derive the renderer configuration for `diagram_text`. Never fails.
pub fn compute_layout(diagram_text: &str) -> LayoutConfig {
    match detect_kind(diagram_text) {
        DiagramKind::Empty => LayoutConfig::default(),
        DiagramKind::Flowchart => LayoutConfig::flowchart(),
        DiagramKind::C4 => {
            let stats = DiagramStats::collect(diagram_text);
            debug!(
                elements = stats.total_elements(),
                relationships = stats.relationships,
                mean_label_length = stats.mean_label_length;
                "computing C4 layout"
            );
            let geometry = element_tier(C4Geometry::BASELINE, stats.total_elements());
            let geometry = relationship_pass(geometry, stats.relationships);
            let geometry = label_pass(geometry, stats.mean_label_length);
            LayoutConfig::c4(geometry)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SHOP: &str = r#"C4Context
    title Online store
    Person(customer, "Customer", "Buys things")
    System(shop, "Shop", "Sells things")
    System_Ext(stripe, "Stripe", "Takes payments")
    Rel(customer, shop, "Browses")
    Rel(shop, stripe, "Charges cards")
"#;

    fn c4_with(people: usize, rels: usize, label: &str) -> String {
        let mut out = String::from("C4Context\n");
        for i in 0..people {
            out.push_str(&format!("Person(p{i}, \"P{i}\")\n"));
        }
        for i in 0..rels {
            out.push_str(&format!("Rel(p0, p{i}, \"{label}\")\n"));
        }
        out
    }

    #[test]
    fn empty_text_gets_default() {
        assert_eq!(compute_layout(""), LayoutConfig::default());
        assert_eq!(compute_layout("  \n"), LayoutConfig::default());
    }

    #[test]
    fn flowcharts_ignore_c4_counts() {
        let text = "graph LR\n  Person(a) --> B[Shop]\n  Rel(x, y, \"a very long label that goes on and on\")";
        let layout = compute_layout(text);
        assert_eq!(layout.kind, DiagramKind::Flowchart);
        assert_eq!(layout.flowchart, FlowchartGeometry::DEFAULT);
        assert_eq!(layout.c4, C4Geometry::BASELINE);
        let config = layout.to_renderer_config();
        assert_eq!(config["flowchart"]["nodeSpacing"], 100);
        assert!(config.get("c4").is_none());
    }

    #[test]
    fn detects_kinds() {
        assert_eq!(detect_kind("flowchart TD\n a-->b"), DiagramKind::Flowchart);
        assert_eq!(detect_kind(SHOP), DiagramKind::C4);
        assert_eq!(detect_kind("just some words"), DiagramKind::C4);
    }

    #[test]
    fn collects_shop_stats() {
        let stats = DiagramStats::collect(SHOP);
        assert_eq!(stats.actors, 1);
        assert_eq!(stats.systems, 1);
        assert_eq!(stats.external_systems, 1);
        assert_eq!(stats.relationships, 2);
        assert_eq!(stats.mean_label_length, (7.0 + 13.0) / 2.0);
    }

    #[test]
    fn unlabeled_relationships_do_not_divide_by_zero() {
        let stats = DiagramStats::collect("Rel(a, b)\nRel(b, c)");
        assert_eq!(stats.relationships, 2);
        assert_eq!(stats.mean_label_length, 0.0);
    }

    #[test]
    fn shop_uses_the_three_element_tier() {
        let layout = compute_layout(SHOP);
        assert_eq!(layout.kind, DiagramKind::C4);
        assert_eq!(layout.c4.shape_margin, 270);
        assert_eq!(layout.c4.diagram_margin_x, 220);
        assert_eq!(layout.c4.box_margin, 85);
        assert_eq!(layout.to_renderer_config()["c4"]["c4ShapeMargin"], 270);
    }

    #[test]
    fn element_tier_replaces_previous_values() {
        let inflated = C4Geometry {
            shape_margin: 9_000,
            ..C4Geometry::BASELINE
        };
        assert_eq!(element_tier(inflated, 7).shape_margin, 350);
        assert_eq!(element_tier(inflated, 0), C4Geometry::BASELINE);
        assert_eq!(element_tier(inflated, 7).message_font_size, 13);
    }

    #[test]
    fn relationship_pass_adds_on_top() {
        let base = element_tier(C4Geometry::BASELINE, 7);
        assert_eq!(relationship_pass(base, 4), base);
        assert_eq!(relationship_pass(base, 5).shape_margin, 400);
        let busy = relationship_pass(base, 7);
        assert_eq!(busy.shape_margin, 450);
        assert_eq!(busy.diagram_margin_x, 360);
        assert_eq!(busy.diagram_margin_y, 260);
    }

    #[test]
    fn label_pass_shrinks_font_to_a_floor() {
        let base = C4Geometry::BASELINE;
        assert_eq!(label_pass(base, 15.0), base);
        assert_eq!(label_pass(base, 16.0).shape_margin, 290);
        let long = label_pass(base, 30.0);
        assert_eq!(long.shape_margin, 330);
        assert_eq!(long.message_font_size, 13);
        let floor = C4Geometry {
            message_font_size: MIN_MESSAGE_FONT_SIZE,
            ..base
        };
        assert_eq!(label_pass(floor, 30.0).message_font_size, MIN_MESSAGE_FONT_SIZE);
    }

    #[test]
    fn passes_compose_in_order() {
        let text = c4_with(7, 7, "sends nightly settlement reports to");
        let layout = compute_layout(&text);
        assert_eq!(layout.c4.shape_margin, 350 + 100 + 80);
        assert_eq!(layout.c4.diagram_margin_x, 280 + 80);
        assert_eq!(layout.c4.message_font_size, 12);
    }

    proptest! {
        #[test]
        fn layout_is_deterministic(text in ".{0,300}") {
            prop_assert_eq!(compute_layout(&text), compute_layout(&text));
        }

        #[test]
        fn more_elements_never_shrink_margins(a in 0usize..12, b in 0usize..12, rels in 0usize..9) {
            let (few, many) = if a <= b { (a, b) } else { (b, a) };
            let small = compute_layout(&c4_with(few, rels, "uses")).c4;
            let large = compute_layout(&c4_with(many, rels, "uses")).c4;
            prop_assert!(large.shape_margin >= small.shape_margin);
            prop_assert!(large.diagram_margin_x >= small.diagram_margin_x);
            prop_assert!(large.diagram_margin_y >= small.diagram_margin_y);
            prop_assert!(large.box_margin >= small.box_margin);
        }
    }
}
