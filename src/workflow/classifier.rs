//! 查询分类与实时信息判断
//!
//! classify 按固定优先级依次尝试各类别规则（dice_action → research → general），首个命中即返回；
//! 每条模式是「正向匹配 且 不命中否定词」的两段式谓词，不依赖正则前瞻。
//! needs_live_info 是独立的关键词判断，可在分类之后改写计划（为 general 前置 web_search）。

use std::sync::OnceLock;

use regex::Regex;

use crate::workflow::TaskCategory;

/// 单条模式：positive 命中且 negative（若有）不命中
struct PatternTest {
    source: &'static str,
    positive: Regex,
    negative: Option<Regex>,
}

impl PatternTest {
    fn new(positive: &'static str) -> Self {
        Self {
            source: positive,
            positive: Regex::new(positive).unwrap(),
            negative: None,
        }
    }

    fn unless(mut self, negative: &'static str) -> Self {
        self.negative = Some(Regex::new(negative).unwrap());
        self
    }

    fn matches(&self, query: &str) -> bool {
        self.positive.is_match(query)
            && !self.negative.as_ref().is_some_and(|re| re.is_match(query))
    }
}

/// 一个类别的规则：任一模式命中即归入该类别
struct ClassificationRule {
    category: TaskCategory,
    patterns: Vec<PatternTest>,
}

impl ClassificationRule {
    fn first_match(&self, query: &str) -> Option<&'static str> {
        self.patterns
            .iter()
            .find(|p| p.matches(query))
            .map(|p| p.source)
    }
}

/// 「深度」词：出现时 `what is X` 不再是一般问答
const DEPTH_WORDS: &str = r"latest|current|recent";

static RULES: OnceLock<Vec<ClassificationRule>> = OnceLock::new();

/// 规则顺序即优先级，不可调换：general 必须最后求值，充当默认类别
fn rules() -> &'static [ClassificationRule] {
    RULES.get_or_init(|| {
        vec![
            ClassificationRule {
                category: TaskCategory::DiceAction,
                patterns: vec![
                    PatternTest::new(r"\broll\b.*\b(dice|die)\b"),
                    PatternTest::new(r"\b(dice|die)\b.*\broll\b"),
                    PatternTest::new(r"\d+d\d+"),
                ],
            },
            ClassificationRule {
                category: TaskCategory::Research,
                patterns: vec![
                    PatternTest::new(r"research|study|analyze|investigate|survey"),
                    PatternTest::new(r"latest|recent|current|news"),
                    PatternTest::new(r"history of|background on|timeline of"),
                    PatternTest::new(r"compare|contrast|difference between|versus"),
                    PatternTest::new(r"comprehensive|detailed|in-depth"),
                    PatternTest::new(r"\b(2024|2025)\b"),
                ],
            },
            ClassificationRule {
                category: TaskCategory::General,
                patterns: vec![
                    PatternTest::new(r"what is\b").unless(DEPTH_WORDS),
                    PatternTest::new(r"define|definition"),
                    PatternTest::new(r"explain briefly|simple explanation"),
                    PatternTest::new(r"^(who|what|when|where|why|how)\s"),
                ],
            },
        ]
    })
}

/// 将查询归入任务类别；纯函数，未命中任何规则时返回 General
pub fn classify(query: &str) -> TaskCategory {
    let lowered = query.trim().to_lowercase();
    for rule in rules() {
        if let Some(pattern) = rule.first_match(&lowered) {
            tracing::info!(category = %rule.category, pattern, "query classified");
            return rule.category;
        }
    }
    tracing::info!(category = %TaskCategory::General, "no specific pattern matched, defaulting");
    TaskCategory::General
}

/// 表示需要实时信息的关键词（与分类规则各自维护）；短词 now / news 按整词匹配，避免 known、renown 之类误判
const LIVE_INFO_PATTERN: &str = r"latest|current|recent|today|\bnow\b|\bnews\b|update|2024|2025|this year";

static LIVE_INFO_RE: OnceLock<Regex> = OnceLock::new();

/// 查询是否需要实时信息（web_search）
pub fn needs_live_info(query: &str) -> bool {
    let re = LIVE_INFO_RE.get_or_init(|| Regex::new(LIVE_INFO_PATTERN).unwrap());
    let lowered = query.to_lowercase();
    match re.find(&lowered) {
        Some(hit) => {
            tracing::debug!(keyword = hit.as_str(), "query needs live information");
            true
        }
        None => false,
    }
}
