// Walkthrough of the compile → eval | explain surface
//
// Demonstrates:
// - Attribute mapping with sparse-context fallbacks
// - Group-assignment rules over multi-valued attributes
// - Policy preconditions
// - The step-by-step explain trace

use cel_lite::{cel, compile, Context};

fn main() {
    let context = Context::new().bind(
        "saml",
        cel!({
            "issuer": "https://idp.example.edu",
            "attributes": {
                "mail": ["  Jordan.Doe@Example.EDU  "],
                "eduPersonAffiliation": ["member", "student"],
                "displayName": "Jordan Doe"
            }
        }),
    );

    println!("=== Attribute mapping ===");
    for source in [
        "lower(trim(first(saml.attributes.mail)))",
        "coalesce(saml.attributes.nickname, saml.attributes.displayName, 'unknown')",
        "first(split(saml.attributes.displayName, ' '))",
    ] {
        show_eval(source, &context);
    }

    println!("\n=== Group assignment ===");
    for source in [
        "'student' in saml.attributes.eduPersonAffiliation ? 'students' : 'guests'",
        "containsAny(saml.attributes.eduPersonAffiliation, ['faculty', 'staff'])",
    ] {
        show_eval(source, &context);
    }

    println!("\n=== Policy precondition ===");
    show_eval(
        "startsWith(saml.issuer, 'https://') && has(saml.attributes.mail)",
        &context,
    );

    println!("\n=== Explain trace ===");
    let program = compile("size(saml.attributes.eduPersonAffiliation) > 1").unwrap();
    let explanation = program.explain(&context);
    for entry in &explanation.trace {
        println!(
            "  #{:<3} {:<10} {:<50} => {}",
            entry.id, entry.kind, entry.expr, entry.value
        );
    }
    println!("  result: {}", explanation.result.unwrap());
}

fn show_eval(source: &str, context: &Context) {
    let program = compile(source).expect("demo expressions compile");
    match program.eval(context) {
        Ok(value) => println!("  {}\n    => {}", source, value),
        Err(e) => println!("  {}\n    !! {}", source, e),
    }
}
