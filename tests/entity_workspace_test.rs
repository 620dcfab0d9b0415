//! Entity workspace integration tests

use mlndash::document::EntityKind;
use mlndash::entity::{Catalog, EditorState, EntityWorkspace, EnumDecl, StreamDecl};
use mlndash::errors::{GraphError, ValidationIssue};
use mlndash::model::{Attribute, AttributeDraft, PrimitiveType};
use serde_json::json;

fn catalog() -> Catalog {
    Catalog::new(
        vec![StreamDecl::new(
            "Orders",
            vec![Attribute::new("orderId", PrimitiveType::Integer.into())],
        )],
        vec![EnumDecl::new(
            "Status",
            vec!["OPEN".to_string(), "CLOSED".to_string()],
        )],
    )
}

fn finish_issues(ws: &mut EntityWorkspace, id: &str) -> Vec<ValidationIssue> {
    match ws.finish(id) {
        Err(GraphError::NodeInvalid { issues, .. }) => {
            issues.iter().map(|i| i.root().clone()).collect()
        }
        other => panic!("expected validation issues, got {:?}", other),
    }
}

#[test]
fn test_new_stream_and_enum_commit_together() {
    let mut ws = EntityWorkspace::new(catalog());
    assert!(ws.is_empty());
    assert!(!ws.can_commit());

    let priority = ws.add_enum().unwrap();
    {
        let editor = ws.enum_mut(&priority).unwrap();
        editor.set_name("Priority").unwrap();
        editor.add_value("LOW");
        editor.add_value("HIGH");
    }
    let shipments = ws.add_stream().unwrap();
    {
        let editor = ws.stream_mut(&shipments).unwrap();
        editor.set_name("Shipments").unwrap();
        editor.push_attribute(AttributeDraft::new("shipmentId", "integer", None));
        editor.push_attribute(AttributeDraft::new("carrier", "string", Some(32)));
        editor.push_attribute(AttributeDraft::new("priority", "Priority", None));
        editor.push_attribute(AttributeDraft::new("status", "Status", None));
    }

    // one unfinished entity per kind at a time
    assert!(ws.add_enum().is_none());
    assert!(ws.add_stream().is_none());

    ws.finish(&priority).unwrap();
    assert!(ws.can_add_enum());
    assert!(!ws.can_commit());

    let json = ws.finish(&shipments).unwrap();
    assert_eq!(json["streamName"], "Shipments");
    assert_eq!(json["fields"].as_array().unwrap().len(), 4);
    assert!(ws.can_commit());
    assert!(!ws.is_update());

    let doc = ws.to_entities_doc().unwrap();
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.groups[0].kind, EntityKind::Enum);
    assert_eq!(
        doc.groups[0].children[0],
        json!({ "enumName": "Priority", "values": [["LOW", 0], ["HIGH", 1]] })
    );
    assert_eq!(doc.groups[1].kind, EntityKind::Stream);
}

#[test]
fn test_names_taken_by_the_catalog_are_rejected() {
    let mut ws = EntityWorkspace::new(catalog());

    let stream = ws.add_stream().unwrap();
    {
        let editor = ws.stream_mut(&stream).unwrap();
        editor.set_name("Orders").unwrap();
        editor.push_attribute(AttributeDraft::new("orderId", "integer", None));
    }
    assert_eq!(
        finish_issues(&mut ws, &stream),
        vec![ValidationIssue::DuplicateName("Stream", "Orders".to_string())]
    );

    let status = ws.add_enum().unwrap();
    {
        let editor = ws.enum_mut(&status).unwrap();
        editor.set_name("Status").unwrap();
        editor.add_value("NEW");
    }
    assert_eq!(
        finish_issues(&mut ws, &status),
        vec![ValidationIssue::DuplicateName("Enum", "Status".to_string())]
    );

    // primitive type keywords are never valid enum names
    ws.enum_mut(&status).unwrap().set_name("float").unwrap();
    assert_eq!(
        finish_issues(&mut ws, &status),
        vec![ValidationIssue::ReservedTypeName("float".to_string())]
    );
    assert!(!ws.can_commit());
}

#[test]
fn test_attribute_issues_are_reported_per_attribute() {
    let mut ws = EntityWorkspace::new(catalog());
    let stream = ws.add_stream().unwrap();
    {
        let editor = ws.stream_mut(&stream).unwrap();
        editor.set_name("Readings").unwrap();
        editor.push_attribute(AttributeDraft::new("label", "string", None));
        editor.push_attribute(AttributeDraft::new("value", "float", Some(4)));
        editor.push_attribute(AttributeDraft::new("unit", "Unit", None));
    }
    assert_eq!(
        finish_issues(&mut ws, &stream),
        vec![
            ValidationIssue::MissingSize,
            ValidationIssue::SizeNotAllowed("float".to_string()),
            ValidationIssue::UnknownType("Unit".to_string()),
        ]
    );
    let editor = ws.stream_mut(&stream).unwrap();
    assert_eq!(editor.state(), EditorState::Draft);
    assert!(!editor.is_committed());
}

#[test]
fn test_existing_stream_opens_for_update() {
    let decl = catalog().stream("Orders").cloned().unwrap();
    let (mut ws, id) = EntityWorkspace::open_existing_stream(catalog(), decl);
    assert!(ws.is_update());
    assert!(ws.can_commit());

    {
        let editor = ws.stream_mut(&id).unwrap();
        assert!(editor.has_read_only_name());
        assert_eq!(
            editor.set_name("Invoices"),
            Err(ValidationIssue::ReadOnlyName("Orders".to_string()))
        );
        editor.push_attribute(AttributeDraft::new("status", "Status", None));
    }

    // the stored name does not collide with itself
    ws.finish(&id).unwrap();
    let doc = ws.to_entities_doc().unwrap();
    assert_eq!(doc.len(), 1);
    let fields = doc.groups[0].children[0]["fields"].as_array().unwrap().clone();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[1]["name"], "status");
}

#[test]
fn test_edits_after_finish_keep_committed_declaration() {
    let decl = EnumDecl::new("Color", vec!["RED".to_string()]);
    let (mut ws, id) = EntityWorkspace::open_existing_enum(Catalog::default(), decl.clone());

    ws.enum_mut(&id).unwrap().add_value("");
    assert!(ws.can_commit());
    let doc = ws.to_entities_doc().unwrap();
    assert_eq!(doc.groups[0].children[0], decl.to_json().unwrap());

    let issues = finish_issues(&mut ws, &id);
    assert_eq!(issues, vec![ValidationIssue::EmptyValue]);
}
