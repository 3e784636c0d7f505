//! BC app manifest (`app.json`) modeling and the Test-Toolkit injection
//! the verification engine performs before compiling a combined project.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One `dependencies[]` entry in `app.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: Uuid,
    pub name: String,
    pub publisher: String,
    pub version: String,
}

fn toolkit_uuid(raw: &str) -> Uuid {
    Uuid::parse_str(raw).expect("fixed Test Toolkit UUID is well-formed")
}

fn library_assert() -> &'static Dependency {
    static DEP: OnceLock<Dependency> = OnceLock::new();
    DEP.get_or_init(|| Dependency {
        id: toolkit_uuid("dd0be2ea-f733-4d65-bb34-a28f4624fb14"),
        name: "Library Assert".to_string(),
        publisher: "Microsoft".to_string(),
        version: "27.0.0.0".to_string(),
    })
}

fn any_library() -> &'static Dependency {
    static DEP: OnceLock<Dependency> = OnceLock::new();
    DEP.get_or_init(|| Dependency {
        id: toolkit_uuid("e7320ebb-08b3-4406-b1ec-b4927d3e280b"),
        name: "Any".to_string(),
        publisher: "Microsoft".to_string(),
        version: "27.0.0.0".to_string(),
    })
}

fn tests_test_libraries() -> &'static Dependency {
    static DEP: OnceLock<Dependency> = OnceLock::new();
    DEP.get_or_init(|| Dependency {
        id: toolkit_uuid("5d86850b-0d76-4eca-bd7b-951ad998e997"),
        name: "Tests-TestLibraries".to_string(),
        publisher: "Microsoft".to_string(),
        version: "27.0.0.0".to_string(),
    })
}

/// The three fixed Test-Toolkit dependencies injected into every
/// combined verify project's `app.json`.
pub fn test_toolkit_dependencies() -> [&'static Dependency; 3] {
    [library_assert(), any_library(), tests_test_libraries()]
}

const ID_RANGE_FROM: u64 = 80_000;
const ID_RANGE_TO: u64 = 89_999;

fn dependency_present(dependencies: &[Value], id: Uuid) -> bool {
    dependencies.iter().any(|dep| {
        dep.get("id")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .is_some_and(|existing| existing == id)
    })
}

fn dependency_value(dep: &Dependency) -> Value {
    serde_json::json!({
        "id": dep.id.to_string(),
        "name": dep.name,
        "publisher": dep.publisher,
        "version": dep.version,
    })
}

/// Merge the three fixed Test-Toolkit dependencies into `app_json`'s
/// `dependencies[]` array (skipping any already present by id), add
/// `prereq` as a direct dependency if given and not already present, and
/// extend `idRanges` to cover `[80000, 89999]` for test codeunits.
/// Idempotent: calling this twice on the same input yields an
/// identical tree both times.
pub fn prepare_app_json_for_tests(app_json: &mut Value, prereq: Option<&Dependency>) {
    let object = match app_json.as_object_mut() {
        Some(object) => object,
        None => return,
    };

    let dependencies = object.entry("dependencies").or_insert_with(|| Value::Array(Vec::new()));
    if !dependencies.is_array() {
        *dependencies = Value::Array(Vec::new());
    }
    let Value::Array(dependencies) = dependencies else {
        unreachable!("just ensured dependencies is an array");
    };

    for dep in test_toolkit_dependencies() {
        if !dependency_present(dependencies, dep.id) {
            dependencies.push(dependency_value(dep));
        }
    }
    if let Some(prereq) = prereq {
        if !dependency_present(dependencies, prereq.id) {
            dependencies.push(dependency_value(prereq));
        }
    }

    extend_id_ranges(object);
}

fn extend_id_ranges(object: &mut serde_json::Map<String, Value>) {
    let ranges = object.entry("idRanges").or_insert_with(|| Value::Array(Vec::new()));
    if !ranges.is_array() {
        *ranges = Value::Array(Vec::new());
    }
    let Value::Array(ranges) = ranges else {
        unreachable!("just ensured idRanges is an array");
    };

    let already_covered = ranges.iter().any(|range| {
        let from = range.get("from").and_then(Value::as_u64);
        let to = range.get("to").and_then(Value::as_u64);
        matches!((from, to), (Some(from), Some(to)) if from <= ID_RANGE_FROM && to >= ID_RANGE_TO)
    });
    if !already_covered {
        ranges.push(serde_json::json!({ "from": ID_RANGE_FROM, "to": ID_RANGE_TO }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn injects_all_three_toolkit_dependencies() {
        let mut app_json = json!({ "id": "...", "dependencies": [] });
        prepare_app_json_for_tests(&mut app_json, None);
        let deps = app_json["dependencies"].as_array().unwrap();
        assert_eq!(deps.len(), 3);
    }

    #[test]
    fn property_6_merge_is_idempotent_across_dependencies_and_id_ranges() {
        let mut app_json = json!({ "id": "...", "dependencies": [] });
        prepare_app_json_for_tests(&mut app_json, None);
        let first = app_json.clone();
        prepare_app_json_for_tests(&mut app_json, None);
        assert_eq!(app_json, first);
    }

    #[test]
    fn does_not_duplicate_an_already_present_toolkit_dependency() {
        let mut app_json = json!({
            "dependencies": [{
                "id": "dd0be2ea-f733-4d65-bb34-a28f4624fb14",
                "name": "Library Assert",
                "publisher": "Microsoft",
                "version": "27.0.0.0",
            }]
        });
        prepare_app_json_for_tests(&mut app_json, None);
        let deps = app_json["dependencies"].as_array().unwrap();
        assert_eq!(deps.len(), 3);
    }

    #[test]
    fn adds_prereq_as_direct_dependency() {
        let mut app_json = json!({ "dependencies": [] });
        let prereq = Dependency {
            id: Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap(),
            name: "Shared Library".to_string(),
            publisher: "CentralGauge".to_string(),
            version: "1.0.0.0".to_string(),
        };
        prepare_app_json_for_tests(&mut app_json, Some(&prereq));
        let deps = app_json["dependencies"].as_array().unwrap();
        assert_eq!(deps.len(), 4);
    }

    #[test]
    fn extends_id_ranges_to_cover_test_codeunit_range() {
        let mut app_json = json!({ "dependencies": [], "idRanges": [{ "from": 50000, "to": 50099 }] });
        prepare_app_json_for_tests(&mut app_json, None);
        let ranges = app_json["idRanges"].as_array().unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1]["from"], 80_000);
        assert_eq!(ranges[1]["to"], 89_999);
    }

    #[test]
    fn does_not_add_redundant_id_range_when_already_covered() {
        let mut app_json = json!({ "dependencies": [], "idRanges": [{ "from": 70000, "to": 90000 }] });
        prepare_app_json_for_tests(&mut app_json, None);
        let ranges = app_json["idRanges"].as_array().unwrap();
        assert_eq!(ranges.len(), 1);
    }
}
