use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sanitas_sanitizer::{check_css, clean_url, Sanitizer, Tag, Token, UrlProtocols};

fn sample_tokens() -> Vec<Token> {
    let mut tokens = Vec::new();
    for i in 0..50 {
        tokens.push(Token::Open(
            Tag::new("div")
                .html()
                .with_attr("class", "infobox")
                .with_attr("style", "border: 1px solid #aaa; width: 22em")
                .with_attr("id", format!("section {}", i))
                .with_attr("onclick", "alert(1)"),
        ));
        tokens.push(Token::text("Lorem ipsum dolor sit amet"));
        tokens.push(Token::Open(
            Tag::new("a").with_attr("href", "https://en.wikipedia.org/wiki/Main Page"),
        ));
        tokens.push(Token::Close(Tag::new("a")));
        tokens.push(Token::Close(Tag::new("div").html()));
    }
    tokens
}

fn sanitize_token_stream(c: &mut Criterion) {
    let sanitizer = Sanitizer::default();
    let tokens = sample_tokens();

    c.bench_function("sanitize_token_stream", |b| {
        b.iter(|| sanitizer.sanitize_tokens(black_box(tokens.clone())))
    });
}

fn degrade_hostile_tags(c: &mut Criterion) {
    let sanitizer = Sanitizer::default();
    let tokens: Vec<Token> = (0..200)
        .map(|_| {
            Token::Open(
                Tag::new("script")
                    .html()
                    .with_attr("src", "https://evil.example/x.js")
                    .with_attr("type", "text/javascript"),
            )
        })
        .collect();

    c.bench_function("degrade_hostile_tags", |b| {
        b.iter(|| sanitizer.sanitize_tokens(black_box(tokens.clone())))
    });
}

fn check_css_values(c: &mut Criterion) {
    let values = [
        "color: red; background: #fff",
        "width: e\\78 pression(alert(1))",
        "font-family: 'Ｍｓ Ｐゴシック'",
        "background: url('unterminated)",
        "margin: 0 /* comment */ auto",
    ];

    c.bench_function("check_css", |b| {
        b.iter(|| {
            for value in &values {
                black_box(check_css(black_box(value)));
            }
        })
    });
}

fn clean_urls(c: &mut Criterion) {
    let protocols = UrlProtocols::default();
    let urls = [
        "https://example.org/wiki/Foo",
        "http://[2001:db8::1]:8080/x y",
        "javascript:alert(1)",
        "//exa\u{200B}mple.org/path",
    ];

    c.bench_function("clean_url", |b| {
        b.iter(|| {
            for url in &urls {
                black_box(clean_url(black_box(url), &protocols));
            }
        })
    });
}

criterion_group!(
    benches,
    sanitize_token_stream,
    degrade_hostile_tags,
    check_css_values,
    clean_urls
);
criterion_main!(benches);
