//! Template variable naming conventions

/// Suffix of variables holding a DHIS2 identifier.
pub const ID_SUFFIX: &str = "_id";

/// Suffix of the variables derived from an identifier lookup.
pub const NAME_SUFFIX: &str = "_name";

/// Splits `<base>_id` into `<base>`.
pub fn id_base(variable: &str) -> Option<&str> {
    variable
        .strip_suffix(ID_SUFFIX)
        .filter(|base| !base.is_empty())
}

/// Name of the variable that holds the display name of `<base>`.
pub fn name_variable(base: &str) -> String {
    format!("{base}{NAME_SUFFIX}")
}

/// `organisation_unit` -> `organisationUnit`
pub fn camel_case(snake: &str) -> String {
    let mut output = String::with_capacity(snake.len());

    for (index, word) in snake.split('_').filter(|w| !w.is_empty()).enumerate() {
        if index == 0 {
            output.push_str(word);
            continue;
        }

        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            output.extend(first.to_uppercase());
            output.push_str(chars.as_str());
        }
    }

    output
}

/// Plural of a camel-cased resource name: a trailing `y` becomes `ies`,
/// anything else gets an `s`.
pub fn plural(word: &str) -> String {
    match word.strip_suffix('y') {
        Some(stem) => format!("{stem}ies"),
        None => format!("{word}s"),
    }
}

/// API collection of a variable base: `category_option_combo` ->
/// `categoryOptionCombos`.
pub fn collection_name(base: &str) -> String {
    plural(&camel_case(base))
}
