use crate::domain::email::MessageRecord;
use crate::pipeline::Report;

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2em auto;padding:0 1em}\
table{border-collapse:collapse;width:100%}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left}\
label{display:block;margin:.5em 0}";

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title>\
         <style>{STYLE}</style></head><body>\n{body}\n</body></html>\n",
        escape_html(title)
    )
}

fn search_form(search: &str) -> String {
    format!(
        "<form method=\"post\" action=\"/\">\n\
         <label>Email <input type=\"email\" name=\"EMAIL\" required></label>\n\
         <label>Password <input type=\"password\" name=\"PASSWORD\" required></label>\n\
         <label>Subject contains <input type=\"text\" name=\"PESQUISA\" value=\"{}\"></label>\n\
         <button type=\"submit\">Search</button>\n</form>",
        escape_html(search)
    )
}

pub fn form_page() -> String {
    layout(
        "Mail tally",
        &format!("<h1>Mail tally</h1>\n{}", search_form("")),
    )
}

fn dropped_item(rec: &MessageRecord) -> String {
    if rec.date.trim().is_empty() {
        format!("<li>Missing date: {}</li>\n", escape_html(&rec.subject))
    } else {
        format!(
            "<li>Unreadable date \"{}\": {}</li>\n",
            escape_html(&rec.date),
            escape_html(&rec.subject)
        )
    }
}

pub fn results_page(report: &Report, show_dropped: bool) -> String {
    let mut body = format!(
        "<h1>Messages matching \"{}\"</h1>\n",
        escape_html(&report.search)
    );

    match &report.chart {
        Some(chart) => body.push_str(&format!(
            "<img src=\"{}\" alt=\"Messages per day\">\n",
            escape_html(&chart.url)
        )),
        None => body.push_str("<p>No data available to plot.</p>\n"),
    }

    body.push_str(&format!("<p>{} messages</p>\n", report.rows.len()));
    body.push_str("<table>\n<tr><th>Date</th><th>Subject</th></tr>\n");
    for row in &report.rows {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            row.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            escape_html(&row.record.subject)
        ));
    }
    body.push_str("</table>\n");

    if show_dropped && !(report.dropped.is_empty() && report.diagnostics.is_empty()) {
        body.push_str("<h2>Not counted</h2>\n<ul>\n");
        for rec in &report.dropped {
            body.push_str(&dropped_item(rec));
        }
        for diag in &report.diagnostics {
            body.push_str(&format!("<li>{}</li>\n", escape_html(&diag.message)));
        }
        body.push_str("</ul>\n");
    }

    body.push_str("<h2>New search</h2>\n");
    body.push_str(&search_form(&report.search));
    layout("Mail tally results", &body)
}

pub fn error_page(status: u16, message: &str) -> String {
    layout(
        "Mail tally error",
        &format!(
            "<h1>Request failed ({status})</h1>\n<p>{}</p>\n<p><a href=\"/\">Back</a></p>",
            escape_html(message)
        ),
    )
}
