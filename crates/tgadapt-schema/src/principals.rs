//! `SHOW USER` / `SHOW GROUP` listings.
//!
//! Both listings are blank-line separated blocks:
//!
//! ```text
//!   - Name: alice
//!     - GraphName: Social
//!       - Roles: designer, querywriter
//!     - Rule: dept=eng            (groups only)
//! ```
//!
//! Only the roles granted on the active graph are kept.

use crate::error::PrincipalParseError;
use crate::model::{Group, User};

/// Built-in superuser; it is not a per-graph principal.
const SUPERUSER: &str = "tigergraph";

struct PrincipalBlock {
    name: String,
    roles: Vec<String>,
    rule: String,
}

pub fn parse_show_user(text: &str, graph_name: &str) -> Result<Vec<User>, PrincipalParseError> {
    Ok(parse_blocks(text, graph_name, "USER")?
        .into_iter()
        .filter(|b| b.name != SUPERUSER)
        .map(|b| User {
            name: b.name,
            roles: b.roles,
        })
        .collect())
}

pub fn parse_show_group(text: &str, graph_name: &str) -> Result<Vec<Group>, PrincipalParseError> {
    Ok(parse_blocks(text, graph_name, "GROUP")?
        .into_iter()
        .map(|b| Group {
            name: b.name,
            roles: b.roles,
            rule: b.rule,
        })
        .collect())
}

fn parse_blocks(
    text: &str,
    graph_name: &str,
    listing: &'static str,
) -> Result<Vec<PrincipalBlock>, PrincipalParseError> {
    let lines: Vec<&str> = text.lines().collect();
    let err = |line_index: usize, message: String| PrincipalParseError::Line {
        line: line_index + 1,
        listing,
        message,
    };

    let mut blocks = Vec::new();
    let mut i = 0usize;
    while i < lines.len() {
        let Some((_, name)) = lines[i].split_once("- Name:") else {
            i += 1;
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(err(i, "principal name missing".to_string()));
        }

        let mut block = PrincipalBlock {
            name: name.to_string(),
            roles: Vec::new(),
            rule: String::new(),
        };

        i += 1;
        while i < lines.len() && !lines[i].trim().is_empty() {
            let line = lines[i];
            if let Some((_, graph)) = line.split_once("- GraphName:") {
                if graph.trim() == graph_name {
                    i += 1;
                    let roles_line = lines
                        .get(i)
                        .filter(|l| !l.trim().is_empty())
                        .ok_or_else(|| err(i - 1, format!("no roles follow graph `{graph_name}`")))?;
                    let (_, roles) = roles_line
                        .split_once(':')
                        .ok_or_else(|| err(i, format!("expected `- Roles: ...`, got `{roles_line}`")))?;
                    block.roles = roles
                        .trim()
                        .split(", ")
                        .filter(|r| !r.is_empty())
                        .map(str::to_string)
                        .collect();
                }
            } else if let Some((_, rule)) = line.split_once("- Rule: ") {
                block.rule = rule.trim_end().to_string();
            }
            i += 1;
        }

        blocks.push(block);
    }

    Ok(blocks)
}
