//! Print the parse tree and the query tree of a query
//!
//! cargo run -p quarry-parse --example parse_query -- 'filter year > 1900 | order -year'

use pest::Parser;
use quarry_parse::{parse, QuarryParser, Rule};

fn main() {
    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| r#"filter author.name = "Ann" | order -year"#.to_string());

    match QuarryParser::parse(Rule::query, &input) {
        Ok(pairs) => {
            for pair in pairs {
                print_pair(&pair, 0);
            }
        }
        Err(e) => println!("Error: {}", e),
    }

    match parse(&input) {
        Ok(query) => println!("{}", serde_json::to_string_pretty(&query).unwrap_or_default()),
        Err(e) => println!("Error: {}", e),
    }
}

fn print_pair(pair: &pest::iterators::Pair<Rule>, indent: usize) {
    let indent_str = "  ".repeat(indent);
    println!("{}Rule::{:?} = {:?}", indent_str, pair.as_rule(), pair.as_str());
    for inner in pair.clone().into_inner() {
        print_pair(&inner, indent + 1);
    }
}
