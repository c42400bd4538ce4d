/// Clean user-supplied text using the ammonia library.
///
/// Comment text and free-text answers are rendered back to both parties,
/// so anything that looks like markup is sanitized on the way in.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
