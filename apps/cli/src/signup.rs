//! The bundled sign-up form schema.

use formwork_schema::SchemaNode;
use formwork_schema::prelude::*;

/// Sign-up form: capitalized name, an email on `domain`, a password of at
/// least six characters and at least two rated technologies.
pub fn schema(domain: &str) -> SchemaNode {
    let domain = domain.trim_start_matches('@').to_owned();
    let suffix = format!("@{domain}");

    object()
        .field(
            "name",
            string()
                .min_length(1)
                .message("Name is required")
                .capitalize_words(),
        )
        .field(
            "email",
            string()
                .min_length(1)
                .message("Email is required")
                .email()
                .message("Invalid email format")
                .refine_str(
                    move |email| email.ends_with(&suffix),
                    format!("Email must belong to {domain}"),
                ),
        )
        .field(
            "password",
            string()
                .min_length(6)
                .message("Password needs at least 6 characters"),
        )
        .field(
            "techs",
            list(
                object()
                    .field("title", string().min_length(1).message("Title is required"))
                    .field("knowledge", number().coerce().min(1.0).max(100.0)),
            )
            .min_items(2)
            .message("Add at least two technologies"),
        )
        .into()
}
