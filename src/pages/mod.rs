//! Server-rendered HTML pages.
//!
//! Every page shares [`html_shell`], which also mounts the chat widget. The
//! `client` query parameter is carried through links and into the widget so
//! the tenant stays selected while the visitor browses.

pub mod content;
pub mod quiz;

use std::fmt::Write as _;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::api::ClientQuery;
use crate::chat::markup::escape_html;

/// Append the tenant selector to an internal link.
#[must_use]
pub fn with_client(href: &str, client: Option<&str>) -> String {
    match client.filter(|c| !c.is_empty()) {
        Some(client) => {
            let encoded: String = url::form_urlencoded::byte_serialize(client.as_bytes()).collect();
            let sep = if href.contains('?') { '&' } else { '?' };
            format!("{href}{sep}client={encoded}")
        }
        None => href.to_string(),
    }
}

/// Generate the HTML shell for a page.
#[must_use]
pub fn html_shell(title: &str, content: &str, client: Option<&str>) -> String {
    let title = escape_html(title);
    let client_attr = escape_html(client.unwrap_or_default());
    let link = |href: &str| escape_html(&with_client(href, client));
    let (home, services, about, blog, quiz) = (
        link("/"),
        link("/services"),
        link("/about"),
        link("/blog"),
        link("/quiz"),
    );

    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Northwind Digital: websites, search and ads for growing businesses">
    <title>{title} - Northwind Digital</title>
    <link rel="stylesheet" href="/static/app.css">
    <script defer src="/static/chat-widget.js"></script>
</head>
<body>
    <header class="site-header">
        <a href="{home}" class="brand">Northwind Digital</a>
        <nav>
            <a href="{services}">Services</a>
            <a href="{about}">About</a>
            <a href="{blog}">Blog</a>
            <a href="{quiz}" class="button">Free website analysis</a>
        </nav>
    </header>

    <main id="app">
        {content}
    </main>

    <footer class="site-footer">
        <p>&copy; Northwind Digital. All rights reserved.</p>
    </footer>

    <div id="chat-widget" data-client="{client_attr}" data-sessions-url="/api/chat/sessions"></div>
</body>
</html>"#)
}

fn page(title: &str, content: &str, client: Option<&str>) -> Html<String> {
    Html(html_shell(title, content, client))
}

fn not_found_page(client: Option<&str>) -> Response {
    let content = format!(
        r#"<section class="narrow">
            <h1>Page not found</h1>
            <p>The page you are looking for does not exist.</p>
            <a class="button" href="{}">Back to the home page</a>
        </section>"#,
        escape_html(&with_client("/", client))
    );
    (StatusCode::NOT_FOUND, page("Not found", &content, client)).into_response()
}

/// Index page handler.
pub async fn index_handler(Query(query): Query<ClientQuery>) -> Html<String> {
    let client = query.client.as_deref();
    let mut content = format!(
        r#"<section class="hero">
            <h1>Websites that bring you customers</h1>
            <p>We design, build and promote sites for growing businesses.</p>
            <a class="button" href="{}">Get a free website analysis</a>
        </section>
        <section class="cards">"#,
        escape_html(&with_client("/quiz", client))
    );
    for service in content::SERVICES {
        let _ = write!(
            content,
            r#"<a class="card" href="{}"><h3>{}</h3><p>{}</p></a>"#,
            escape_html(&with_client(&format!("/services/{}", service.slug), client)),
            escape_html(service.title),
            escape_html(service.summary),
        );
    }
    content.push_str(r#"</section><section class="testimonials">"#);
    for t in content::TESTIMONIALS {
        let _ = write!(
            content,
            "<blockquote><p>{}</p><footer>{}, {}</footer></blockquote>",
            escape_html(t.quote),
            escape_html(t.author),
            escape_html(t.company),
        );
    }
    content.push_str("</section>");
    page("Home", &content, client)
}

/// Services listing.
pub async fn services_handler(Query(query): Query<ClientQuery>) -> Html<String> {
    let client = query.client.as_deref();
    let mut content = String::from(r#"<h1>Services</h1><section class="cards">"#);
    for service in content::SERVICES {
        let _ = write!(
            content,
            r#"<a class="card" href="{}"><h3>{}</h3><p>{}</p></a>"#,
            escape_html(&with_client(&format!("/services/{}", service.slug), client)),
            escape_html(service.title),
            escape_html(service.summary),
        );
    }
    content.push_str("</section>");
    page("Services", &content, client)
}

/// One service.
pub async fn service_handler(
    Path(slug): Path<String>,
    Query(query): Query<ClientQuery>,
) -> Response {
    let client = query.client.as_deref();
    let Some(service) = content::service(&slug) else {
        return not_found_page(client);
    };
    let mut content = format!(
        r#"<article class="narrow"><h1>{}</h1><p class="lead">{}</p>"#,
        escape_html(service.title),
        escape_html(service.summary)
    );
    for paragraph in service.body {
        let _ = write!(content, "<p>{}</p>", escape_html(paragraph));
    }
    let _ = write!(
        content,
        r#"<a class="button" href="{}">See what we would change on your site</a></article>"#,
        escape_html(&with_client("/quiz", client))
    );
    page(service.title, &content, client).into_response()
}

/// About page handler.
pub async fn about_handler(Query(query): Query<ClientQuery>) -> Html<String> {
    let client = query.client.as_deref();
    let mut content = String::from(
        r#"<section class="narrow">
            <h1>About us</h1>
            <p>Northwind Digital is a small team of designers and marketers. We work with
            local and growing businesses and measure our work in leads, not pageviews.</p>
            <h2>Team</h2><ul class="team">"#,
    );
    for member in content::TEAM {
        let _ = write!(
            content,
            "<li><strong>{}</strong> {}</li>",
            escape_html(member.name),
            escape_html(member.role)
        );
    }
    content.push_str("</ul></section>");
    page("About", &content, client)
}

/// Blog index.
pub async fn blog_handler(Query(query): Query<ClientQuery>) -> Html<String> {
    let client = query.client.as_deref();
    let mut content = String::from(r#"<h1>Blog</h1><section class="posts">"#);
    for post in content::POSTS {
        let _ = write!(
            content,
            r#"<article><h2><a href="{}">{}</a></h2><time>{}</time><p>{}</p></article>"#,
            escape_html(&with_client(&format!("/blog/{}", post.slug), client)),
            escape_html(post.title),
            escape_html(post.date),
            escape_html(post.summary),
        );
    }
    content.push_str("</section>");
    page("Blog", &content, client)
}

/// One blog post.
pub async fn post_handler(Path(slug): Path<String>, Query(query): Query<ClientQuery>) -> Response {
    let client = query.client.as_deref();
    let Some(post) = content::post(&slug) else {
        return not_found_page(client);
    };
    let mut content = format!(
        r#"<article class="narrow"><h1>{}</h1><time>{}</time>"#,
        escape_html(post.title),
        escape_html(post.date)
    );
    for paragraph in post.body {
        let _ = write!(content, "<p>{}</p>", escape_html(paragraph));
    }
    content.push_str("</article>");
    page(post.title, &content, client).into_response()
}

/// Fallback for unknown paths.
pub async fn not_found_handler(Query(query): Query<ClientQuery>) -> Response {
    not_found_page(query.client.as_deref())
}
