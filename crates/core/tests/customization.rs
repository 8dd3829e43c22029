//! End-to-end properties of template customization.

use kitforge_core::customize::{apply, LayerModification, ResolvedAssets, VariantConfiguration};
use kitforge_core::layers::{parse, LayerRole};

const JERSEY: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 300 300">
  <!-- front panel -->
  <g id="body">
    <path d="M0 0h100v100z" fill="#ffffff"/>
    <path d="M0 0h50v50z" fill="none"/>
  </g>
  <g id="sleeves"><rect x="0" y="0" width="30" height="60" fill="#ffffff"/></g>
  <text id="player_name" x="10" y="280"><tspan>PLAYER</tspan></text>
  <g id="teamNumber"><text>00</text></g>
</svg>
"##;

fn graphic(layer: &str, value: &str) -> LayerModification {
    LayerModification {
        layer_id: layer.into(),
        role: LayerRole::Graphic,
        value: value.into(),
    }
}

fn text(layer: &str, value: &str) -> LayerModification {
    LayerModification {
        layer_id: layer.into(),
        role: LayerRole::Text,
        value: value.into(),
    }
}

fn catalog() -> ResolvedAssets {
    let mut assets = ResolvedAssets::default();
    assets.colors.insert("red".into(), "#ff0000".into());
    assets.colors.insert("navy".into(), "#000080".into());
    assets
}

#[test]
fn body_recolor_keeps_none_fills() {
    let config = VariantConfiguration {
        layer_modifications: vec![graphic("body", "red")],
        team_number_visible: true,
        ..Default::default()
    };

    let out = apply(JERSEY, &config, &catalog()).expect("apply");
    let doc = parse(&out).expect("reparse");

    let body = doc.element("body").expect("body");
    let fills: Vec<Option<&str>> = body.child_elements().map(|p| p.attr("fill")).collect();
    assert_eq!(fills, [Some("#ff0000"), Some("none")]);

    let team = doc.element("teamNumber").expect("team number");
    assert_eq!(team.attr("display"), None);

    // untouched layers keep their colors
    let sleeve = doc
        .element("sleeves")
        .and_then(|g| g.child_elements().next())
        .expect("sleeve rect");
    assert_eq!(sleeve.attr("fill"), Some("#ffffff"));
}

#[test]
fn application_is_deterministic() {
    let config = VariantConfiguration {
        layer_modifications: vec![graphic("body", "navy"), text("player_name", "O'NEIL \"10\"")],
        team_number_visible: false,
        ..Default::default()
    };

    let first = apply(JERSEY, &config, &catalog()).expect("apply");
    let second = apply(JERSEY, &config, &catalog()).expect("apply");
    assert_eq!(first, second);
}

#[test]
fn applications_do_not_accumulate() {
    let red = VariantConfiguration {
        layer_modifications: vec![graphic("sleeves", "red")],
        ..Default::default()
    };
    let navy = VariantConfiguration {
        layer_modifications: vec![graphic("body", "navy")],
        ..Default::default()
    };

    let navy_alone = apply(JERSEY, &navy, &catalog()).expect("apply");
    let _ = apply(JERSEY, &red, &catalog()).expect("apply");
    let navy_after_red = apply(JERSEY, &navy, &catalog()).expect("apply");
    assert_eq!(navy_alone, navy_after_red);

    let doc = parse(&navy_after_red).expect("reparse");
    let sleeve = doc
        .element("sleeves")
        .and_then(|g| g.child_elements().next())
        .expect("sleeve rect");
    assert_eq!(sleeve.attr("fill"), Some("#ffffff"));
}

#[test]
fn empty_configuration_preserves_structure() {
    let out = apply(JERSEY, &VariantConfiguration::default(), &ResolvedAssets::default())
        .expect("apply");
    let original = parse(JERSEY).expect("parse");
    let reparsed = parse(&out).expect("reparse");
    assert_eq!(original.root, reparsed.root);
    assert!(out.starts_with("<?xml"));
    assert!(out.contains("<!-- front panel -->"));
}

#[test]
fn malformed_template_is_rejected() {
    assert!(apply("<svg><g></svg>", &VariantConfiguration::default(), &catalog()).is_err());
}

const ILLUSTRATOR_EXPORT: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<!-- Generator: Adobe Illustrator 27.0.0, SVG Export Plug-In . SVG Version: 6.00 Build 0)  -->
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd" [
	<!ENTITY ns_extend "http://ns.adobe.com/Extensibility/1.0/">
	<!ENTITY ns_ai "http://ns.adobe.com/AdobeIllustrator/10.0/">
	<!ENTITY ns_graphs "http://ns.adobe.com/Graphs/1.0/">
]>
<svg version="1.1" xmlns:x="&ns_extend;" xmlns:i="&ns_ai;" xmlns:graph="&ns_graphs;"
	 xmlns="http://www.w3.org/2000/svg" viewBox="0 0 300 300">
<g id="body"><path d="M0 0h100v100z" fill="#FFFFFF"/></g>
<text id="player_name" x="10" y="280">PLAYER</text>
</svg>
"##;

#[test]
fn illustrator_export_with_doctype_entities_is_customizable() {
    let layers = parse(ILLUSTRATOR_EXPORT).expect("parse");
    assert!(layers.layer("body").is_some());

    let config = VariantConfiguration {
        layer_modifications: vec![graphic("body", "navy"), text("player_name", "SMITH")],
        ..Default::default()
    };
    let out = apply(ILLUSTRATOR_EXPORT, &config, &catalog()).expect("apply");
    let doc = parse(&out).expect("reparse");

    let body = doc.element("body").expect("body");
    let fills: Vec<Option<&str>> = body.child_elements().map(|p| p.attr("fill")).collect();
    assert_eq!(fills, [Some("#000080")]);
    assert_eq!(
        doc.element("player_name").expect("name").text_content(),
        "SMITH"
    );
    assert!(out.contains(r#"xmlns:x="http://ns.adobe.com/Extensibility/1.0/""#));
}
