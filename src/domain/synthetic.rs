//! Deterministic fallback tree built from the industry table alone.
//!
//! Used when every generation strategy fails. No external call, same query
//! in, same tree out.

use tracing::debug;

use crate::domain::classifier::{classify, find_industry, Classification};
use crate::domain::entities::{Node, Procedure};

const FORM_KEY: &str = "business_form";
const ACTIVITY_KEY: &str = "activity";
const STANDARD_ACTIVITY: &str = "Standard operation";
const MAX_ACTIVITIES: usize = 3;

struct Authority {
    needles: &'static [&'static str],
    jurisdiction: &'static str,
    url: &'static str,
    requirements: &'static str,
    fee: &'static str,
    deadline: &'static str,
}

/// First matching rule wins; the last one matches everything.
static AUTHORITIES: &[Authority] = &[
    Authority {
        needles: &["food", "sanitation", "hygiene", "食品", "衛生"],
        jurisdiction: "Public health center",
        url: "https://www.mhlw.go.jp/",
        requirements: "Facility floor plan, food sanitation supervisor certificate",
        fee: "Set by the prefecture",
        deadline: "Before opening",
    },
    Authority {
        needles: &["fire", "消防"],
        jurisdiction: "Fire department",
        url: "https://www.fdma.go.jp/",
        requirements: "Fire safety plan, equipment inspection report",
        fee: "Free",
        deadline: "Before opening",
    },
    Authority {
        needles: &["construction", "demolition", "building", "architect", "waste", "road", "建設"],
        jurisdiction: "Prefectural government / Ministry of Land, Infrastructure, Transport and Tourism",
        url: "https://www.mlit.go.jp/",
        requirements: "Business plan, proof of qualified engineer, financial statements",
        fee: "Set by the issuing authority",
        deadline: "Before starting work",
    },
    Authority {
        needles: &["lodging", "inn", "guest", "宿泊", "旅館"],
        jurisdiction: "Prefectural public health center",
        url: "https://www.mhlw.go.jp/",
        requirements: "Floor plan, neighbour notice records, fire safety certificate",
        fee: "Set by the prefecture",
        deadline: "Before accepting guests",
    },
    Authority {
        needles: &["corporate", "法人"],
        jurisdiction: "Legal affairs bureau",
        url: "https://houmukyoku.moj.go.jp/",
        requirements: "Articles of incorporation, registration application, seal certificate",
        fee: "Registration and license tax",
        deadline: "Within 2 weeks of incorporation",
    },
    Authority {
        needles: &["license", "liquor", "tax", "export", "免許"],
        jurisdiction: "Tax office",
        url: "https://www.nta.go.jp/",
        requirements: "Application form, business plan, proof of premises",
        fee: "Registration and license tax",
        deadline: "Two months before starting",
    },
    Authority {
        needles: &[],
        jurisdiction: "Municipal office",
        url: "https://www.gov-online.go.jp/",
        requirements: "Application form, identity document",
        fee: "Free",
        deadline: "Before starting",
    },
];

fn authority_for(name: &str) -> &'static Authority {
    let lower = name.to_lowercase();
    AUTHORITIES
        .iter()
        .find(|a| a.needles.is_empty() || a.needles.iter().any(|n| lower.contains(n)))
        .unwrap_or(&AUTHORITIES[AUTHORITIES.len() - 1])
}

/// Numbers procedures within one synthetic tree. A name always maps to
/// the same record, so shared procedures dedupe by id.
struct ProcedureFactory {
    prefix: String,
    made: Vec<Procedure>,
}

impl ProcedureFactory {
    fn new(industry: &str) -> Self {
        let slug: String = industry
            .to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        Self {
            prefix: format!("SYN-{slug}"),
            made: Vec::new(),
        }
    }

    fn make(&mut self, name: &str) -> Procedure {
        if let Some(existing) = self.made.iter().find(|p| p.name == name) {
            return existing.clone();
        }
        let authority = authority_for(name);
        let procedure = Procedure {
            procedure_id: format!("{}-{:03}", self.prefix, self.made.len() + 1),
            name: name.to_string(),
            jurisdiction: authority.jurisdiction.to_string(),
            url: authority.url.to_string(),
            requirements: Some(authority.requirements.to_string()),
            deadline: Some(authority.deadline.to_string()),
            fee: Some(authority.fee.to_string()),
        };
        self.made.push(procedure.clone());
        procedure
    }
}

/// Build the fallback tree for `query`.
pub fn synthetic_tree(query: &str) -> Node {
    synthetic_tree_for(&classify(query))
}

/// Two question levels: business form, then activity. Each leaf holds the
/// form's base procedure plus the procedures of the chosen activity.
pub fn synthetic_tree_for(classification: &Classification) -> Node {
    let industry = classification.industry.as_str();

    let mut activities: Vec<(String, Vec<String>)> = find_industry(industry)
        .map(|ind| {
            ind.subcategories
                .iter()
                .take(MAX_ACTIVITIES)
                .map(|sub| {
                    (
                        sub.name.to_string(),
                        sub.procedures.iter().map(|p| p.to_string()).collect(),
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    if activities.is_empty() {
        activities.push((
            STANDARD_ACTIVITY.to_string(),
            classification.related_procedures.clone(),
        ));
    }

    let forms = [
        ("Sole proprietor", "Notification of business commencement (sole proprietor) to the tax office"),
        ("Corporation", "Corporate registration"),
    ];

    let mut factory = ProcedureFactory::new(industry);
    let children = forms
        .iter()
        .map(|(_, base)| {
            let leaves = activities
                .iter()
                .map(|(_, names)| {
                    let mut procedures = vec![factory.make(base)];
                    procedures.extend(names.iter().map(|n| factory.make(n)));
                    Node::result(procedures)
                })
                .collect();
            Node::question(
                format!("Which {} activity applies to you?", industry.to_lowercase()),
                ACTIVITY_KEY,
                activities.iter().map(|(name, _)| name.clone()).collect(),
                leaves,
            )
        })
        .collect();

    debug!("built synthetic tree for {industry} with {} procedures", factory.made.len());
    Node::question(
        format!("How will you run your {} business?", industry.to_lowercase()),
        FORM_KEY,
        forms.iter().map(|(form, _)| form.to_string()).collect(),
        children,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repair::validate_and_fix_node;

    #[test]
    fn given_same_query_when_building_twice_then_trees_match() {
        assert_eq!(synthetic_tree("open a restaurant"), synthetic_tree("open a restaurant"));
    }

    #[test]
    fn given_any_query_when_building_then_tree_needs_no_repair() {
        for query in ["sake brewery", "open a bakery", "民泊", ""] {
            let outcome = validate_and_fix_node(&synthetic_tree(query));
            assert!(outcome.is_valid, "{query}: {:?}", outcome.errors);
            assert!(outcome.fixes.is_empty());
        }
    }

    #[test]
    fn given_procedure_under_both_forms_when_building_then_same_id() {
        let tree = synthetic_tree("restaurant");
        let root = tree.as_question().unwrap();
        let leaf_ids = |child: &Node| -> Vec<String> {
            match &child.as_question().unwrap().children[0] {
                Node::Result(r) => r.procedure_list.iter().map(|p| p.procedure_id.clone()).collect(),
                Node::Question(_) => panic!("expected a leaf"),
            }
        };

        let sole = leaf_ids(&root.children[0]);
        let corp = leaf_ids(&root.children[1]);

        assert_ne!(sole[0], corp[0]);
        assert_eq!(sole[1..], corp[1..]);
    }

    #[test]
    fn given_license_and_food_names_when_routing_then_picks_authority() {
        assert_eq!(authority_for("Liquor retail license").jurisdiction, "Tax office");
        assert_eq!(authority_for("Food business license").jurisdiction, "Public health center");
        assert_eq!(authority_for("Something else").jurisdiction, "Municipal office");
    }
}
