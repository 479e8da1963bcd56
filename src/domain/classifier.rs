//! Static industry classification of free-text queries.
//!
//! A fixed lookup table maps query keywords to an industry, its matching
//! subcategories and the procedures those usually involve. The result seeds
//! search queries, generation prompts and the synthetic fallback tree.

use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

pub const GENERAL_INDUSTRY: &str = "General business";
const MAX_SEARCH_QUERIES: usize = 8;

pub struct Subcategory {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub procedures: &'static [&'static str],
}

pub struct Industry {
    pub name: &'static str,
    pub primary_keywords: &'static [&'static str],
    pub subcategories: &'static [Subcategory],
}

pub static INDUSTRIES: &[Industry] = &[
    Industry {
        name: "Lodging",
        primary_keywords: &[
            "lodging", "guesthouse", "guest house", "ryokan", "hotel", "airbnb", "minpaku",
            "vacation rental", "民泊", "宿泊", "旅館", "ゲストハウス",
        ],
        subcategories: &[
            Subcategory {
                name: "Private home sharing",
                keywords: &["minpaku", "airbnb", "vacation rental", "home sharing", "民泊"],
                procedures: &[
                    "Private lodging business notification",
                    "Fire safety compliance certificate",
                    "Guest registry setup",
                ],
            },
            Subcategory {
                name: "Inn or hotel",
                keywords: &["hotel", "ryokan", "旅館", "ホテル"],
                procedures: &["Inn business license", "Building standards conformity check"],
            },
            Subcategory {
                name: "Absentee host",
                keywords: &["absentee", "management company", "remote host", "管理業者"],
                procedures: &["Lodging management company contract"],
            },
        ],
    },
    Industry {
        name: "Alcohol",
        primary_keywords: &[
            "sake", "brewery", "liquor", "alcohol", "winery", "distillery", "酒造", "酒類",
        ],
        subcategories: &[
            Subcategory {
                name: "Manufacturing",
                keywords: &["brew", "manufactur", "distill", "produce", "製造"],
                procedures: &["Liquor manufacturing license", "Food business license"],
            },
            Subcategory {
                name: "Retail sales",
                keywords: &["sell", "retail", "shop", "online", "販売"],
                procedures: &["Liquor retail license"],
            },
            Subcategory {
                name: "Wholesale and export",
                keywords: &["wholesale", "export", "import", "輸出", "卸"],
                procedures: &["Liquor wholesale license", "Export declaration"],
            },
        ],
    },
    Industry {
        name: "Restaurant",
        primary_keywords: &[
            "restaurant", "cafe", "café", "bar", "diner", "izakaya", "food truck", "飲食",
            "レストラン", "カフェ",
        ],
        subcategories: &[
            Subcategory {
                name: "Dine-in",
                keywords: &["seats", "dine-in", "dine in", "store", "店舗"],
                procedures: &[
                    "Food business license",
                    "Food sanitation supervisor notification",
                    "Fire prevention manager appointment",
                ],
            },
            Subcategory {
                name: "Late-night alcohol service",
                keywords: &["late night", "late-night", "midnight", "深夜"],
                procedures: &["Late-night liquor service notification"],
            },
            Subcategory {
                name: "Mobile food",
                keywords: &["food truck", "kitchen car", "mobile", "キッチンカー"],
                procedures: &["Mobile food business license", "Road use permit"],
            },
        ],
    },
    Industry {
        name: "Construction",
        primary_keywords: &[
            "construction", "contractor", "builder", "renovation", "建設", "工事",
        ],
        subcategories: &[
            Subcategory {
                name: "Building work",
                keywords: &["building", "new build", "remodel", "建築"],
                procedures: &["Construction business license", "Architect office registration"],
            },
            Subcategory {
                name: "Demolition",
                keywords: &["demolition", "demolish", "解体"],
                procedures: &[
                    "Demolition business registration",
                    "Construction recycling notification",
                ],
            },
            Subcategory {
                name: "Waste handling",
                keywords: &["waste", "debris", "産廃"],
                procedures: &["Industrial waste collection permit"],
            },
        ],
    },
];

const BUSINESS_KEYWORDS: &[&str] = &[
    "business", "company", "corporation", "startup", "open", "opening", "start", "sell",
    "sales", "retail", "manufactur", "shop", "store", "restaurant", "cafe", "bar", "hotel",
    "lodging", "airbnb", "minpaku", "brewery", "sake", "liquor", "construction",
    "contractor", "酒造", "酒類", "飲食", "建設", "製造", "販売", "小売", "開業", "起業",
    "営業", "事業", "会社", "法人", "民泊", "宿泊", "旅館", "ホテル",
];

const PROCEDURE_KEYWORDS: &[&str] = &[
    "permit", "license", "licence", "registration", "register", "notification", "notify",
    "application", "apply", "filing", "approval", "procedure", "許可", "申請", "届出", "認可",
    "登録", "免許", "手続き",
];

/// What the lookup table says about one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub industry: String,
    pub subcategories: Vec<String>,
    pub expanded_keywords: Vec<String>,
    pub related_procedures: Vec<String>,
    pub search_queries: Vec<String>,
}

impl Classification {
    pub fn is_general(&self) -> bool {
        self.industry == GENERAL_INDUSTRY
    }
}

/// Classify `query` against the industry table.
///
/// An industry whose primary keyword occurs in the query wins outright.
/// Failing that, the first partial match on primary or subcategory
/// keywords is used; otherwise the query is general business.
pub fn classify(query: &str) -> Classification {
    let needle = query.trim().to_lowercase();
    let mut c = Classification {
        expanded_keywords: vec![query.trim().to_string()],
        ..Default::default()
    };

    if let Some(industry) = INDUSTRIES
        .iter()
        .find(|ind| ind.primary_keywords.iter().any(|k| needle.contains(k)))
    {
        c.industry = industry.name.to_string();
        c.expanded_keywords
            .extend(industry.primary_keywords.iter().map(|k| k.to_string()));
        for sub in industry.subcategories {
            if sub.keywords.iter().any(|k| needle.contains(k)) {
                absorb(&mut c, sub, sub.keywords.len());
            }
        }
    } else if !needle.is_empty() {
        partial_match(&needle, &mut c);
    }

    if c.industry.is_empty() {
        c.industry = GENERAL_INDUSTRY.to_string();
    }

    c.expanded_keywords = c.expanded_keywords.into_iter().unique().collect();
    c.related_procedures = c.related_procedures.into_iter().unique().collect();
    c.search_queries = search_queries(&c);
    debug!(
        "classified '{query}' as {} ({} related procedures)",
        c.industry,
        c.related_procedures.len()
    );
    c
}

fn absorb(c: &mut Classification, sub: &Subcategory, keywords: usize) {
    c.subcategories.push(sub.name.to_string());
    c.expanded_keywords
        .extend(sub.keywords.iter().take(keywords).map(|k| k.to_string()));
    c.related_procedures
        .extend(sub.procedures.iter().map(|p| p.to_string()));
}

fn overlaps(keyword: &str, needle: &str) -> bool {
    keyword.contains(needle) || needle.contains(keyword)
}

fn partial_match(needle: &str, c: &mut Classification) {
    for industry in INDUSTRIES {
        if industry.primary_keywords.iter().any(|k| overlaps(k, needle)) {
            c.industry = industry.name.to_string();
            c.expanded_keywords
                .extend(industry.primary_keywords.iter().take(3).map(|k| k.to_string()));
            return;
        }
        if let Some(sub) = industry
            .subcategories
            .iter()
            .find(|sub| sub.keywords.iter().any(|k| overlaps(k, needle)))
        {
            c.industry = industry.name.to_string();
            absorb(c, sub, 2);
            return;
        }
    }
}

fn search_queries(c: &Classification) -> Vec<String> {
    let mut queries = Vec::new();
    let specific = !c.is_general();

    if specific {
        queries.push(format!(
            "{} permit application",
            c.expanded_keywords.iter().take(3).join(" ")
        ));
        queries.push(format!("{} business opening procedures", c.industry));
    }
    for procedure in c.related_procedures.iter().take(4) {
        queries.push(format!("{procedure} application required documents"));
        queries.push(format!("{procedure} fee deadline"));
    }
    for sub in c.subcategories.iter().take(2) {
        queries.push(format!("{} {sub} permit", c.industry));
    }
    if specific {
        queries.push(format!("{} regulations compliance", c.industry));
        queries.push(format!("{} supervising authority", c.industry));
    }

    queries.into_iter().unique().take(MAX_SEARCH_QUERIES).collect()
}

/// Every procedure named anywhere under `industry`, deduplicated.
pub fn all_related_procedures(industry: &str) -> Vec<String> {
    INDUSTRIES
        .iter()
        .filter(|ind| ind.name == industry)
        .flat_map(|ind| ind.subcategories.iter())
        .flat_map(|sub| sub.procedures.iter().map(|p| p.to_string()))
        .unique()
        .collect()
}

pub fn find_industry(name: &str) -> Option<&'static Industry> {
    INDUSTRIES.iter().find(|ind| ind.name == name)
}

/// Cheap gate for queries that have nothing to do with business procedures.
pub fn is_likely_administrative(query: &str) -> bool {
    let needle = query.to_lowercase();
    BUSINESS_KEYWORDS
        .iter()
        .chain(PROCEDURE_KEYWORDS)
        .any(|k| needle.contains(k))
}
