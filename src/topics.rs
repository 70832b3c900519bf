/// Page identifiers scraped by default, in processing order.
pub const DEFAULT_TOPICS: &[&str] = &[
    "История_на_България",
    "Първа_българска_държава",
    "Втора_българска_държава",
    "Средновековна_България",
    "България_под_османска_власт",
    "Българско_възраждане",
    "Княжество_България",
    "Царство_България",
    "Народна_република_България",
    "България_в_Първата_световна_война",
    "България_във_Втората_световна_война",
    "Република_България",
    "Българско-византийски_войни",
    "Априлско_въстание",
    "Балкански_войни",
    "Съединение_на_България",
    "Българска_екзархия",
    "Старобългарска_литература",
    "Османско_владичество",
];

/// Normalises a user-supplied topic to page-identifier form.
pub fn normalize(topic: &str) -> String {
    topic.split_whitespace().collect::<Vec<_>>().join("_")
}
