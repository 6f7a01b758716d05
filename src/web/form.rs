/// Fields posted by the search form.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SearchForm {
    pub email: Option<String>,
    pub password: Option<String>,
    pub search: String,
}

impl SearchForm {
    /// Decodes an `application/x-www-form-urlencoded` body. Unknown fields
    /// are ignored; for repeated fields the last value wins.
    pub fn parse(body: &str) -> Self {
        let mut form = Self::default();
        for (k, v) in url::form_urlencoded::parse(body.as_bytes()) {
            match k.as_ref() {
                "EMAIL" => form.email = Some(v.into_owned()),
                "PASSWORD" => form.password = Some(v.into_owned()),
                "PESQUISA" => form.search = v.trim().to_string(),
                _ => {}
            }
        }
        form
    }
}
