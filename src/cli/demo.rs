//! Synthetic records the CLI converts.
//!
//! `Customer` carries an embedded `Audit` parent, an interned tier and a few
//! collections so the size estimator and the inherited property lookup both
//! have something to chew on. `CustomerSummary` refuses flagged customers,
//! which is how `recast run --fail-every` injects element failures.

use crate::copy::{Properties, PropertyDescriptor};
use crate::error::CopyError;
use crate::{interned, record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

interned!(Tier);

#[derive(Debug, Clone, Default)]
pub struct Audit {
    pub created_at: u64,
    pub created_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct Customer {
    pub audit: Audit,
    pub id: u64,
    pub name: String,
    pub email: String,
    pub tier: Tier,
    pub balance: f64,
    pub tags: Vec<String>,
    pub flagged: bool,
}

record!(Audit { fields: [created_at, created_by] });
record!(Customer {
    fields: [id, name, email, tier, balance, tags, flagged],
    statics: [SCHEMA_VERSION],
    parent: audit => Audit,
});

/// Flattened view of a customer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerSummary {
    pub id: u64,
    pub name: String,
    pub tier: Tier,
    pub balance: f64,
    pub created_by: String,
    /// Filled in by the post-copy callback
    pub tag_count: usize,
}

impl Properties for CustomerSummary {
    fn properties() -> Vec<PropertyDescriptor<Self>> {
        vec![
            PropertyDescriptor::read_write("id", |s: &Self| &s.id, |s: &mut Self| &mut s.id),
            PropertyDescriptor::read_write("name", |s: &Self| &s.name, |s: &mut Self| &mut s.name),
            PropertyDescriptor::read_write("tier", |s: &Self| &s.tier, |s: &mut Self| &mut s.tier),
            PropertyDescriptor::read_write(
                "balance",
                |s: &Self| &s.balance,
                |s: &mut Self| &mut s.balance,
            ),
            PropertyDescriptor::read_write(
                "created_by",
                |s: &Self| &s.created_by,
                |s: &mut Self| &mut s.created_by,
            ),
            PropertyDescriptor::setter("flagged", |_: &mut Self, flagged: bool| {
                if flagged {
                    return Err(CopyError::write("flagged", "flagged customers are not summarized"));
                }
                Ok(())
            }),
        ]
    }
}

const FIRST_NAMES: [&str; 6] = ["Ada", "Grace", "Linus", "Barbara", "Ken", "Margaret"];
const OPERATORS: [&str; 3] = ["import", "signup", "support"];

/// Build `count` customers; every `fail_every`-th one is flagged (0 flags none)
pub fn customers(count: usize, fail_every: usize) -> Vec<Customer> {
    (0..count)
        .map(|i| {
            let first = FIRST_NAMES[i % FIRST_NAMES.len()];
            Customer {
                audit: Audit {
                    created_at: 1_700_000_000 + i as u64 * 60,
                    created_by: OPERATORS[i % OPERATORS.len()].to_string(),
                },
                id: i as u64 + 1,
                name: format!("{} {}", first, i),
                email: format!("{}.{}@example.com", first.to_lowercase(), i),
                tier: match i % 10 {
                    0 => Tier::Enterprise,
                    1..=3 => Tier::Pro,
                    _ => Tier::Free,
                },
                balance: (i % 1000) as f64 * 1.25,
                tags: (0..i % 4).map(|t| format!("tag-{}", t)).collect(),
                flagged: fail_every > 0 && (i + 1).is_multiple_of(fail_every),
            }
        })
        .collect()
}
