//! Authorization (`auth.dsl`) parser.
//!
//! Role and model references are de-pluralized with [`depluralize`]; see its
//! documentation for the limits of that heuristic.

use super::cursor::{Phrase, TokenCursor};
use super::GrammarParser;
use crate::ast::*;
use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::identifier::depluralize;
use crate::lexer::{Position, TokenKind};

pub struct AuthParser {
    cursor: TokenCursor,
}

impl GrammarParser for AuthParser {
    type Output = AuthAst;
    const GRAMMAR: Grammar = Grammar::Auth;

    fn from_cursor(cursor: TokenCursor) -> Self {
        Self { cursor }
    }

    fn parse(mut self) -> Result<AuthAst, ParseError> {
        let mut ast = AuthAst::default();
        loop {
            self.cursor.skip_newlines();
            if self.cursor.at_end() {
                break;
            }
            if self.cursor.check(TokenKind::Roles) && self.cursor.check_at(1, TokenKind::Colon) {
                self.parse_roles(&mut ast.roles)?;
            } else if self.cursor.check(TokenKind::Fields) && self.cursor.check_at(1, TokenKind::For)
            {
                ast.field_rules.push(self.parse_field_rules()?);
            } else {
                ast.model_rules.push(self.parse_model_rules()?);
            }
        }
        Ok(ast)
    }
}

impl AuthParser {
    fn parse_roles(&mut self, roles: &mut Vec<RoleDefinition>) -> Result<(), ParseError> {
        self.cursor.advance();
        self.cursor.expect_header_end("after 'Roles'")?;

        let before = roles.len();
        while let Some(start) = self.cursor.next_item(roles.len() - before, "Roles")? {
            let name = self.cursor.name(&[TokenKind::Colon], "role name")?;
            let description = if self.cursor.eat(TokenKind::Colon) {
                let words = self.cursor.rest_of_line();
                Phrase::from_adjacent(&words).map(|p| p.text)
            } else {
                None
            };
            roles.push(RoleDefinition {
                name: name.text,
                description,
                span: self.cursor.span_from(start),
            });
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&roles[before..], "Roles")?;
        tracing::trace!(roles = roles.len() - before, "parsed roles section");
        Ok(())
    }

    /// Model header: the singular of a bracketed name, otherwise the
    /// de-pluralized name.
    fn parse_model_target(&mut self) -> Result<String, ParseError> {
        let name = self.cursor.model_name(&[TokenKind::Colon])?;
        if name.original_form.contains('[') {
            Ok(name.singular)
        } else {
            Ok(depluralize(&name.singular))
        }
    }

    fn parse_model_rules(&mut self) -> Result<ModelRules, ParseError> {
        let start = self.cursor.start();
        let model_name = self.parse_model_target()?;
        self.cursor.expect_header_end("after model name")?;

        let mut permissions = Vec::new();
        while let Some(item_start) = self.cursor.next_item(permissions.len(), &model_name)? {
            permissions.push(self.parse_permission(item_start)?);
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&permissions, &model_name)?;

        tracing::trace!(model = %model_name, rules = permissions.len(), "parsed model rules");
        Ok(ModelRules {
            model_name,
            permissions,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_field_rules(&mut self) -> Result<FieldRules, ParseError> {
        let start = self.cursor.start();
        self.cursor.advance();
        self.cursor.expect(TokenKind::For, "after 'Fields'")?;
        let model_name = self.parse_model_target()?;
        self.cursor.expect_header_end("after model name")?;
        let section = format!("Fields for {}", model_name);

        let mut permissions = Vec::new();
        while let Some(item_start) = self.cursor.next_item(permissions.len(), &section)? {
            permissions.push(self.parse_field_permission(item_start)?);
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&permissions, &section)?;

        tracing::trace!(model = %model_name, rules = permissions.len(), "parsed field rules");
        Ok(FieldRules {
            model_name,
            permissions,
            span: self.cursor.span_from(start),
        })
    }

    /// `<subject> can <actions> [own|any] [target]`
    fn parse_permission(&mut self, start: Position) -> Result<PermissionRule, ParseError> {
        let subject = self.parse_subject()?;
        let actions = self.parse_actions()?;
        let ownership = self.parse_ownership();
        let target = if self.cursor.at_line_end() {
            None
        } else {
            let target = self.cursor.name(&[], "permission target")?;
            Some(depluralize(&target.text))
        };
        if !self.cursor.at_line_end() {
            return Err(self.cursor.error("Unexpected token in permission rule"));
        }
        Ok(PermissionRule {
            subject,
            actions,
            ownership,
            target,
            span: self.cursor.span_from(start),
        })
    }

    /// `[only] <subject> can <actions> [own|any] <field>`
    fn parse_field_permission(&mut self, start: Position) -> Result<FieldPermission, ParseError> {
        let exclusive = self.cursor.eat(TokenKind::Only);
        let subject = self.parse_subject()?;
        let actions = self.parse_actions()?;
        let ownership = self.parse_ownership();
        let field = self.cursor.name(&[], "field name")?;
        if !self.cursor.at_line_end() {
            return Err(self.cursor.error("Unexpected token in field rule"));
        }
        Ok(FieldPermission {
            subject,
            actions,
            ownership,
            field: field.text,
            exclusive,
            span: self.cursor.span_from(start),
        })
    }

    /// Subject up to and including `can`.
    fn parse_subject(&mut self) -> Result<Subject, ParseError> {
        let subject = match self.cursor.kind() {
            TokenKind::Anyone if self.cursor.check_at(1, TokenKind::Can) => {
                self.cursor.advance();
                Subject::Anyone
            }
            TokenKind::Authenticated
                if self.cursor.check_at(1, TokenKind::Users)
                    && self.cursor.check_at(2, TokenKind::Can) =>
            {
                self.cursor.advance();
                self.cursor.advance();
                Subject::AuthenticatedUsers
            }
            TokenKind::Users if self.cursor.check_at(1, TokenKind::Can) => {
                self.cursor.advance();
                Subject::Users
            }
            _ => {
                let role = self.cursor.name(&[TokenKind::Can], "role or subject")?;
                Subject::Role {
                    name: depluralize(&role.text),
                }
            }
        };
        self.cursor.expect(TokenKind::Can, "after subject")?;
        Ok(subject)
    }

    /// Actions separated by `,` or `and`.
    fn parse_actions(&mut self) -> Result<Vec<PermissionAction>, ParseError> {
        let mut actions = vec![self.parse_action()?];
        while self.cursor.check(TokenKind::Comma)
            || (self.cursor.check(TokenKind::And) && action_of(self.cursor.peek_at(1).kind).is_some())
        {
            self.cursor.advance();
            self.cursor.eat(TokenKind::And);
            actions.push(self.parse_action()?);
        }
        Ok(actions)
    }

    fn parse_action(&mut self) -> Result<PermissionAction, ParseError> {
        let action = action_of(self.cursor.kind()).ok_or_else(|| {
            self.cursor
                .error("Expected permission action (read, create, update, delete or manage)")
        })?;
        self.cursor.advance();
        Ok(action)
    }

    /// `own`, `any` or `all`, optionally preceded by `their`.
    fn parse_ownership(&mut self) -> Option<Ownership> {
        if self.cursor.check_word("their")
            && matches!(self.cursor.peek_at(1).kind, TokenKind::Own)
        {
            self.cursor.advance();
        }
        match self.cursor.kind() {
            TokenKind::Own => {
                self.cursor.advance();
                Some(Ownership::Own)
            }
            TokenKind::Any | TokenKind::All => {
                self.cursor.advance();
                Some(Ownership::Any)
            }
            _ => None,
        }
    }
}

fn action_of(kind: TokenKind) -> Option<PermissionAction> {
    match kind {
        TokenKind::Read => Some(PermissionAction::Read),
        TokenKind::Create => Some(PermissionAction::Create),
        TokenKind::Update => Some(PermissionAction::Update),
        TokenKind::Delete => Some(PermissionAction::Delete),
        TokenKind::Manage => Some(PermissionAction::Manage),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> Result<AuthAst, ParseError> {
        AuthParser::new(tokenize(source).unwrap()).parse()
    }

    #[test]
    fn test_empty_input_is_empty_ast() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("\n\n# nothing yet\n").unwrap().is_empty());
    }

    #[test]
    fn test_roles() {
        let ast = parse("Roles:\n- admin: full access to everything\n- content editor\n").unwrap();
        assert_eq!(ast.roles.len(), 2);
        assert_eq!(ast.roles[0].name, "admin");
        assert_eq!(
            ast.roles[0].description.as_deref(),
            Some("full access to everything")
        );
        assert_eq!(ast.roles[1].name, "content_editor");
        assert_eq!(ast.roles[1].description, None);
    }

    #[test]
    fn test_model_rules_subjects() {
        let source = "\
Posts:
- anyone can read posts
- authenticated users can create posts
- users can update and delete own posts
- admins can manage all posts
- content editors can read, update any posts
";
        let ast = parse(source).unwrap();
        let rules = &ast.model_rules[0];
        assert_eq!(rules.model_name, "Post");
        let p = &rules.permissions;
        assert_eq!(p[0].subject, Subject::Anyone);
        assert_eq!(p[0].actions, vec![PermissionAction::Read]);
        assert_eq!(p[0].target.as_deref(), Some("post"));

        assert_eq!(p[1].subject, Subject::AuthenticatedUsers);
        assert_eq!(p[2].subject, Subject::Users);
        assert_eq!(
            p[2].actions,
            vec![PermissionAction::Update, PermissionAction::Delete]
        );
        assert_eq!(p[2].ownership, Some(Ownership::Own));

        assert_eq!(p[3].subject, Subject::Role { name: "admin".into() });
        assert_eq!(p[3].ownership, Some(Ownership::Any));

        assert_eq!(
            p[4].subject,
            Subject::Role {
                name: "content_editor".into()
            }
        );
        assert_eq!(
            p[4].actions,
            vec![PermissionAction::Read, PermissionAction::Update]
        );
    }

    #[test]
    fn test_depluralize_limitation() {
        let ast = parse("Status:\n- admins can manage\n").unwrap();
        assert_eq!(ast.model_rules[0].model_name, "Statu");
        assert_eq!(ast.model_rules[0].permissions[0].target, None);

        let ast = parse("Status[es]:\n- admins can manage\n").unwrap();
        assert_eq!(ast.model_rules[0].model_name, "Status");
    }

    #[test]
    fn test_field_rules() {
        let source = "\
Fields for User:
- only admins can update role
- users can read their own email
";
        let ast = parse(source).unwrap();
        let rules = &ast.field_rules[0];
        assert_eq!(rules.model_name, "User");
        assert!(rules.permissions[0].exclusive);
        assert_eq!(rules.permissions[0].field, "role");
        assert_eq!(
            rules.permissions[0].subject,
            Subject::Role { name: "admin".into() }
        );
        assert!(!rules.permissions[1].exclusive);
        assert_eq!(rules.permissions[1].ownership, Some(Ownership::Own));
        assert_eq!(rules.permissions[1].field, "email");
    }

    #[test]
    fn test_missing_can() {
        let err = parse("Post:\n- anyone reads posts\n").unwrap_err();
        assert_eq!(err.message, "Expected 'can' after subject, found end of line");
        assert_eq!(err.position.line, 2);
    }

    #[test]
    fn test_unknown_action() {
        let err = parse("Post:\n- anyone can publish posts\n").unwrap_err();
        assert!(err.message.starts_with("Expected permission action"));
        assert_eq!(err.position.column, 14);
    }

    #[test]
    fn test_field_rule_needs_field() {
        let err = parse("Fields for User:\n- admins can update\n").unwrap_err();
        assert!(err.message.starts_with("Expected field name"));
    }
}
