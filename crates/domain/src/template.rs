/// Substitutes every occurrence of `placeholder` with the display name. A
/// recipient without a name gets an empty substitution; a body without the
/// placeholder is returned unchanged.
pub fn render_body(body: &str, placeholder: &str, display_name: Option<&str>) -> String {
    if placeholder.is_empty() || !body.contains(placeholder) {
        return body.to_string();
    }
    body.replace(placeholder, display_name.unwrap_or(""))
}
