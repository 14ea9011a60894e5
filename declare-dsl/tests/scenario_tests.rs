//! End-to-end scenarios through the public entry points.
//!
//! Each test goes source text → tokens → grammar parser → AST and checks the
//! shape a downstream generator would see, including the serialized JSON.

use declare_dsl::*;
use declare_test_utils::assertions::{assert_parse_error_at, assert_tokenizer_error_at};
use declare_test_utils::{fixtures, init_tracing};
use serde_json::json;

// ============================================================================
// SCHEMA
// ============================================================================

#[test]
fn test_single_field_model() {
    init_tracing();
    let ast = parse_schema("User:\n- has email as text").unwrap();

    assert_eq!(ast.models.len(), 1);
    let model = &ast.models[0];
    assert_eq!(model.name.singular, "User");
    assert_eq!(model.name.plural, "User");
    assert_eq!(model.items.len(), 1);

    let ModelItem::Field(field) = &model.items[0] else {
        panic!("expected a field, got {:?}", model.items[0]);
    };
    assert_eq!(field.name, "email");
    assert_eq!(field.field_type, FieldType::Text);
    assert!(field.constraints.is_empty());
}

#[test]
fn test_constraints_accepted_in_either_order() {
    for source in [
        "Post:\n- has title as unique text and required",
        "Post:\n- has title as required and unique text",
    ] {
        let ast = parse_schema(source).unwrap();
        let field = ast.models[0].fields().next().unwrap();
        assert_eq!(field.field_type, FieldType::Text);
        assert!(field.has_constraint(FieldConstraint::Unique));
        assert!(field.has_constraint(FieldConstraint::Required));
        assert_eq!(field.constraints.len(), 2);
    }
}

#[test]
fn test_schema_fixture_models_and_relationships() {
    let ast = parse_schema(fixtures::SCHEMA).unwrap();
    let user = ast.model("User").unwrap();
    assert_eq!(user.name.plural, "Users");
    assert_eq!(user.fields().count(), 3);

    let rel = user.relationships().next().unwrap();
    assert_eq!(rel.kind, RelationshipKind::HasMany);
    assert_eq!(rel.target.singular, "Post");
    assert_eq!(rel.target.plural, "Posts");

    let post = ast.model("Post").unwrap();
    assert_eq!(
        post.relationships().next().unwrap().kind,
        RelationshipKind::BelongsTo
    );
}

#[test]
fn test_field_json_shape() {
    let ast = parse_schema("Post:\n- has title as unique text and required").unwrap();
    let item = serde_json::to_value(&ast.models[0].items[0]).unwrap();

    assert_eq!(item["type"], "field");
    assert_eq!(item["name"], "title");
    assert_eq!(item["field_type"], "TEXT");
    assert_eq!(item["constraints"], json!(["UNIQUE", "REQUIRED"]));
    assert_eq!(item["span"]["start"], json!({"line": 2, "column": 1, "offset": 6}));
}

// ============================================================================
// DML
// ============================================================================

const RECENT_POSTS: &str = "Query for Post:\n- recent posts where created at is after 7 days ago sorted by created at descending limited to 20\n";

#[test]
fn test_recent_posts_query() {
    let ast = parse_dml(RECENT_POSTS).unwrap();
    assert_eq!(ast.sections.len(), 1);

    let Section::Query(section) = &ast.sections[0] else {
        panic!("expected a query section, got {:?}", ast.sections[0]);
    };
    assert_eq!(section.model_name, "Post");
    assert_eq!(section.queries.len(), 1);

    let query = &section.queries[0];
    let conditions = &query.where_clause.as_ref().unwrap().conditions;
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].field, "created_at");
    assert_eq!(conditions[0].operator, ConditionOperator::IsAfter);
    assert_eq!(
        conditions[0].value,
        Some(ConditionValue::Time {
            expression: TimeExpression::Relative {
                value: 7,
                unit: TimeUnit::Days
            }
        })
    );

    let sort = query.sort_clause.as_ref().unwrap();
    assert_eq!(sort.field, "created_at");
    assert_eq!(sort.direction, SortDirection::Descending);
    assert_eq!(query.limit_clause.as_ref().unwrap().count, 20);
}

#[test]
fn test_recent_posts_json_shape() {
    let ast = parse_dml(RECENT_POSTS).unwrap();
    let json = serde_json::to_value(&ast).unwrap();

    let section = &json["sections"][0];
    assert_eq!(section["type"], "query");
    assert_eq!(section["model_name"], "Post");

    let query = &section["queries"][0];
    let condition = &query["where_clause"]["conditions"][0];
    assert_eq!(condition["operator"], "IS_AFTER");
    assert_eq!(
        condition["value"],
        json!({"type": "time", "expression": {"type": "relative", "value": 7, "unit": "DAYS"}})
    );
    assert_eq!(query["sort_clause"]["direction"], "DESCENDING");
    assert_eq!(query["limit_clause"]["count"], 20);
}

#[test]
fn test_ast_deserializes_from_its_json() {
    let ast = parse_document(Grammar::Dml, fixtures::DML, &FrontendConfig::default()).unwrap();
    let text = serde_json::to_string(&ast).unwrap();
    let back: DslAst = serde_json::from_str(&text).unwrap();
    assert_eq!(back, ast);
    assert_eq!(back.grammar(), Grammar::Dml);
}

// ============================================================================
// EMPTY INPUT
// ============================================================================

#[test]
fn test_empty_input_per_grammar() {
    let config = FrontendConfig::default();
    for grammar in Grammar::ALL {
        for source in ["", "\n\n", "# only a comment\n"] {
            let result = parse_document(grammar, source, &config);
            match grammar {
                Grammar::Schema | Grammar::Dml => {
                    assert!(
                        matches!(result, Err(DslError::Parse(_))),
                        "{} accepted {:?}",
                        grammar,
                        source
                    );
                }
                _ => {
                    let ast = result.unwrap();
                    let empty = match grammar {
                        Grammar::Auth => DslAst::Auth(AuthAst::default()),
                        Grammar::Validation => DslAst::Validation(ValidationAst::default()),
                        Grammar::Api => DslAst::Api(ApiAst::default()),
                        Grammar::Monitor => DslAst::Monitor(MonitorAst::default()),
                        Grammar::Log => DslAst::Log(LogAst::default()),
                        Grammar::Seed => DslAst::Seed(SeedAst::default()),
                        Grammar::Security => DslAst::Security(SecurityAst::default()),
                        Grammar::Schema | Grammar::Dml => unreachable!(),
                    };
                    assert_eq!(ast, empty, "{} on {:?}", grammar, source);
                }
            }
        }
    }
}

// ============================================================================
// FIXTURES AND DISPATCH
// ============================================================================

#[test]
fn test_fixtures_parse_through_file_names() {
    init_tracing();
    let config = FrontendConfig::default();
    for grammar in Grammar::ALL {
        let detected = Grammar::from_file_name(&format!("app/declare/{}", grammar)).unwrap();
        assert_eq!(detected, grammar);
        let ast = parse_document(detected, fixtures::source_for(grammar), &config)
            .unwrap_or_else(|e| panic!("{}: {}", grammar, e));
        assert_eq!(ast.grammar(), grammar);
    }
}

#[test]
fn test_one_call_helpers_agree_with_dispatch() {
    let config = FrontendConfig::default();
    let auth = parse_auth(fixtures::AUTH).unwrap();
    assert_eq!(
        parse_document(Grammar::Auth, fixtures::AUTH, &config).unwrap(),
        DslAst::Auth(auth)
    );
    let security = parse_security(fixtures::SECURITY).unwrap();
    assert_eq!(
        parse_document(Grammar::Security, fixtures::SECURITY, &config).unwrap(),
        DslAst::Security(security)
    );
}

#[test]
fn test_parsers_usable_directly_from_tokens() {
    let tokens = tokenize(fixtures::LOG).unwrap();
    let ast = LogParser::new(tokens).parse().unwrap();
    assert_eq!(ast.exclude.as_ref().unwrap().fields, vec!["password"]);

    let tokens = tokenize(fixtures::SEED).unwrap();
    let ast = SeedParser::new(tokens).parse().unwrap();
    assert_eq!(ast.sections.len(), 2);
}

#[test]
fn test_independent_documents_parse_in_parallel() {
    let handles: Vec<_> = Grammar::ALL
        .into_iter()
        .map(|grammar| {
            std::thread::spawn(move || {
                parse_document(
                    grammar,
                    fixtures::source_for(grammar),
                    &FrontendConfig::default(),
                )
                .map(|ast| ast.grammar())
            })
        })
        .collect();
    for (handle, grammar) in handles.into_iter().zip(Grammar::ALL) {
        assert_eq!(handle.join().unwrap().unwrap(), grammar);
    }
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

#[test]
fn test_parse_error_points_at_offending_token() {
    let result = parse_schema("User:\n- has email\n");
    assert_parse_error_at(&result, 2, 12);

    let message = result.unwrap_err().to_string();
    assert!(
        message.starts_with("Parse error at line 2, column 12: "),
        "{}",
        message
    );
    assert!(message.ends_with("found end of line"), "{}", message);
}

#[test]
fn test_tokenizer_error_points_at_character() {
    let result = parse_log("Exclude:\n- pass$word\n");
    assert_tokenizer_error_at(&result, 2, 7);
    assert!(result
        .unwrap_err()
        .to_string()
        .starts_with("Tokenizer error at line 2, column 7: "));
}

#[test]
fn test_invalid_identifier_becomes_parse_error() {
    let err = parse_model_name("User[a|b|c]").unwrap_err();
    assert!(matches!(err, IdentifierError::MalformedPluralization { .. }));

    let result = parse_schema("User[a|b|c]:\n- has email as text\n");
    assert_parse_error_at(&result, 1, 1);
}

#[test]
fn test_first_error_wins() {
    // Two broken lines; only the first is reported.
    let result = parse_schema("User:\n- has email\n- has name\n");
    assert_parse_error_at(&result, 2, 12);
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_limits_from_toml() {
    let config = FrontendConfig::from_toml_str("max_source_bytes = 16\n").unwrap();
    assert_eq!(config.max_source_bytes, 16);
    assert_eq!(
        config.max_tokens,
        FrontendConfig::default().max_tokens,
        "missing keys keep their defaults"
    );

    let err = parse_document(Grammar::Schema, fixtures::SCHEMA, &config).unwrap_err();
    assert!(matches!(err, DslError::Tokenizer(_)));

    assert!(FrontendConfig::from_toml_str("max_tokens = 0\n").is_err());
    assert!(FrontendConfig::from_toml_str("max_widgets = 3\n").is_err());
}

#[test]
fn test_unlimited_config_accepts_fixtures() {
    let config = FrontendConfig::unlimited();
    config.validate().unwrap();
    for grammar in Grammar::ALL {
        parse_document(grammar, fixtures::source_for(grammar), &config).unwrap();
    }
}
