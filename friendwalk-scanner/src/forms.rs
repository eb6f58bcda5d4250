// HTML form model used for login and request approval

use crate::extract::resolve_url;
use crate::page::Page;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static FORM_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").unwrap());
static FIELD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input, textarea, select, button").unwrap());
static OPTION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("option").unwrap());
static PASSWORD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[type=password]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub name: Option<String>,
    /// Absolute URL the form submits to.
    pub action: String,
    pub method: FormMethod,
    /// URL of the page the form was found on, sent as the referrer.
    pub origin: String,
    pub fields: Vec<(String, String)>,
    pub buttons: Vec<(String, String)>,
}

impl Form {
    /// All forms on the page, in document order.
    pub fn parse_all(page: &Page) -> Vec<Form> {
        let document = Html::parse_document(&page.text());
        document
            .select(&FORM_SELECTOR)
            .map(|element| Self::from_element(element, &page.url))
            .collect()
    }

    pub fn find_named(page: &Page, name: &str) -> Option<Form> {
        Self::parse_all(page)
            .into_iter()
            .find(|form| form.name.as_deref() == Some(name))
    }

    fn from_element(element: ElementRef<'_>, page_url: &str) -> Form {
        let attrs = element.value();
        let action = attrs
            .attr("action")
            .filter(|a| !a.trim().is_empty())
            .and_then(|a| resolve_url(page_url, a.trim()))
            .unwrap_or_else(|| page_url.to_string());
        let method = match attrs.attr("method") {
            Some(m) if m.eq_ignore_ascii_case("post") => FormMethod::Post,
            _ => FormMethod::Get,
        };

        let mut fields = Vec::new();
        let mut buttons = Vec::new();

        for field in element.select(&FIELD_SELECTOR) {
            let el = field.value();
            let Some(name) = el.attr("name") else {
                continue;
            };
            let name = name.to_string();

            match el.name() {
                "textarea" => fields.push((name, field.text().collect::<String>())),
                "select" => {
                    let options: Vec<ElementRef<'_>> = field.select(&OPTION_SELECTOR).collect();
                    let chosen = options
                        .iter()
                        .find(|o| o.value().attr("selected").is_some())
                        .or_else(|| options.first());
                    if let Some(option) = chosen {
                        let value = option
                            .value()
                            .attr("value")
                            .map(str::to_string)
                            .unwrap_or_else(|| option.text().collect::<String>());
                        fields.push((name, value));
                    }
                }
                "button" => {
                    let kind = el.attr("type").unwrap_or("submit");
                    if kind.eq_ignore_ascii_case("submit") {
                        buttons.push((name, el.attr("value").unwrap_or_default().to_string()));
                    }
                }
                _ => {
                    let kind = el.attr("type").unwrap_or("text").to_ascii_lowercase();
                    let value = el.attr("value").unwrap_or_default().to_string();
                    match kind.as_str() {
                        "submit" | "image" => buttons.push((name, value)),
                        "button" | "reset" | "file" => {}
                        "checkbox" | "radio" => {
                            if el.attr("checked").is_some() {
                                fields.push((name, if value.is_empty() { "on".into() } else { value }));
                            }
                        }
                        _ => fields.push((name, value)),
                    }
                }
            }
        }

        Form {
            name: attrs.attr("name").map(str::to_string),
            action,
            method,
            origin: page_url.to_string(),
            fields,
            buttons,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets a field value, adding the field when the form does not carry it.
    pub fn set_field(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
    }

    /// Name/value pairs to send, including the clicked button if any.
    pub fn submission(&self, button: Option<usize>) -> Vec<(String, String)> {
        let mut pairs = self.fields.clone();
        if let Some(pair) = button.and_then(|idx| self.buttons.get(idx)) {
            pairs.push(pair.clone());
        }
        pairs
    }
}

/// True when the page still asks for a password, i.e. a login form was served.
pub fn has_password_field(page: &Page) -> bool {
    let document = Html::parse_document(&page.text());
    document.select(&PASSWORD_SELECTOR).next().is_some()
}
