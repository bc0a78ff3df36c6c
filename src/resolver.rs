//! Resolution of descriptors into shows.
//!
//! Plain URLs are fetched and extracted; directives resolve their inner
//! descriptors first (recursively, one after another) and then compose the
//! results.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info};

use crate::compose;
use crate::descriptor::Descriptor;
use crate::error::{ResolveError, Result};
use crate::extractor::ShowExtractor;
use crate::fetch::Fetcher;
use crate::schema::Show;

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<Show>> + Send + 'a>>;

/// Turns descriptors into shows using a page fetcher.
pub struct Resolver<F> {
    fetcher: F,
    extractor: ShowExtractor,
}

impl<F: Fetcher> Resolver<F> {
    pub fn new(fetcher: F) -> Result<Self> {
        Ok(Self {
            fetcher,
            extractor: ShowExtractor::new()?,
        })
    }

    /// Resolve one descriptor. Any failure in a nested descriptor fails the
    /// whole resolution.
    pub fn resolve<'a>(&'a self, descriptor: &'a Descriptor) -> ResolveFuture<'a> {
        Box::pin(async move {
            debug!("Resolving {} descriptor", descriptor.kind());
            match descriptor {
                Descriptor::Url(url) => self.resolve_url(url).await,
                Descriptor::Squash { show, ranges } => {
                    let show = self.resolve(show).await?;
                    Ok(compose::squash(show, ranges))
                }
                Descriptor::Taping { name, parts } => {
                    let mut shows = Vec::with_capacity(parts.len());
                    for part in parts {
                        shows.push(self.resolve(part).await?);
                    }
                    let mut shows = shows.into_iter();
                    let first = shows.next().ok_or_else(|| {
                        ResolveError::InvalidDescriptor("taping has no parts".to_string())
                    })?;
                    Ok(compose::merge_taping(first, shows.collect(), name.as_deref()))
                }
                Descriptor::Partial {
                    show,
                    exclude,
                    exclude_from_count,
                } => {
                    let show = self.resolve(show).await?;
                    Ok(compose::apply_partial(
                        show,
                        exclude,
                        exclude_from_count.unwrap_or(false),
                    ))
                }
            }
        })
    }

    async fn resolve_url(&self, url: &str) -> Result<Show> {
        let raw_html = self
            .fetcher
            .fetch(url)
            .await
            .ok_or_else(|| ResolveError::FetchFailed {
                url: url.to_string(),
            })?;
        let show = self.extractor.extract(&raw_html, url)?;
        info!(
            "Resolved '{}' [{}] with {} matches",
            show.name,
            show.file_stem(),
            show.matches.len()
        );
        Ok(show)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SquashRange;
    use crate::extractor::tests::sample_page;
    use crate::fetch::tests::StubFetcher;

    impl<F> Resolver<F> {
        fn fetcher(&self) -> &F {
            &self.fetcher
        }
    }

    fn url(nr: u32) -> String {
        format!("https://www.cagematch.net/?id=1&nr={nr}")
    }

    /// Page for show `nr` with one match per entry of `results`.
    fn page(nr: u32, date: &str, results: &[&str]) -> String {
        let matches: String = results
            .iter()
            .enumerate()
            .map(|(i, r)| {
                format!(
                    r#"<div class="Match"><div class="MatchType">Match {i}</div><div class="MatchResults"><a href="?id=2&amp;nr={}">W{i}</a> {r}</div></div>"#,
                    nr * 100 + i as u32
                )
            })
            .collect();
        format!(
            r#"<html><body><div class="InformationBoxTable">
<div class="InformationBoxTitle">Name of the event:</div><div class="InformationBoxContents">Show {nr}</div>
<div class="InformationBoxTitle">Promotion:</div><div class="InformationBoxContents"><a href="?id=8&amp;nr=1">WWF</a></div>
<div class="InformationBoxTitle">Arena:</div><div class="InformationBoxContents">Arena {nr}</div>
<div class="InformationBoxTitle">Date:</div><div class="InformationBoxContents">{date}</div>
</div>{matches}</body></html>"#
        )
    }

    fn resolver() -> Resolver<StubFetcher> {
        let stub = StubFetcher::default()
            .with_page(&url(1), page(1, "01.02.1990", &["a", "b", "c"]))
            .with_page(&url(2), page(2, "02.02.1990", &["d", "e"]))
            .with_page(&url(3), page(3, "03.02.1990", &["f"]))
            .with_page(&url(9), sample_page())
            .with_page(&url(10), "<html><body>Not found</body></html>");
        Resolver::new(stub).unwrap()
    }

    fn results(show: &Show) -> Vec<String> {
        show.matches.iter().map(|m| m.result.clone()).collect()
    }

    #[tokio::test]
    async fn test_plain_url_is_repeatable() {
        let resolver = resolver();
        let d = Descriptor::Url(url(9));
        let first = resolver.resolve(&d).await.unwrap();
        let second = resolver.resolve(&d).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.id, vec!["9".to_string()]);
        assert_eq!(resolver.fetcher().calls(), 2);
    }

    #[tokio::test]
    async fn test_taping_concatenates_parts() {
        let resolver = resolver();
        let d = Descriptor::Taping {
            name: None,
            parts: vec![
                Descriptor::Url(url(1)),
                Descriptor::Url(url(2)),
                Descriptor::Url(url(3)),
            ],
        };
        let show = resolver.resolve(&d).await.unwrap();
        assert_eq!(show.id, vec!["1", "2", "3"]);
        assert_eq!(show.matches.len(), 6);
        assert_eq!(show.name, "Show 1 Taping");
        assert_eq!(show.date, "1990-02-01");
        assert_eq!(show.arena, "Arena 1");
    }

    #[tokio::test]
    async fn test_taping_of_partials() {
        let resolver = resolver();
        let d = Descriptor::Taping {
            name: Some("Superstars".to_string()),
            parts: vec![
                Descriptor::Partial {
                    show: Box::new(Descriptor::Url(url(1))),
                    exclude: vec![2],
                    exclude_from_count: None,
                },
                Descriptor::Url(url(2)),
            ],
        };
        let show = resolver.resolve(&d).await.unwrap();
        assert_eq!(show.name, "Superstars");
        assert_eq!(show.matches.len(), 4);
        assert!(show.partial);
        assert!(results(&show)[1].ends_with('c'));
    }

    #[tokio::test]
    async fn test_partial() {
        let resolver = resolver();
        let d = Descriptor::Partial {
            show: Box::new(Descriptor::Url(url(1))),
            exclude: vec![1, 3],
            exclude_from_count: Some(true),
        };
        let show = resolver.resolve(&d).await.unwrap();
        assert_eq!(results(&show), vec!["W1 b".to_string()]);
        assert!(show.partial);
        assert!(show.exclude);
    }

    #[tokio::test]
    async fn test_squash() {
        let resolver = resolver();
        let d = Descriptor::Squash {
            show: Box::new(Descriptor::Url(url(1))),
            ranges: vec![SquashRange { start: 2, end: 3 }],
        };
        let show = resolver.resolve(&d).await.unwrap();
        assert_eq!(results(&show), vec!["W0 a", "W1 b, W2 c"]);
        assert_eq!(show.matches[1].wrestlers.len(), 2);
        assert!(!show.partial);
    }

    #[tokio::test]
    async fn test_failed_part_fails_taping() {
        let resolver = resolver();
        let d = Descriptor::Taping {
            name: None,
            parts: vec![Descriptor::Url(url(1)), Descriptor::Url(url(4))],
        };
        let err = resolver.resolve(&d).await.unwrap_err();
        assert!(matches!(err, ResolveError::FetchFailed { url: failed } if failed == url(4)));
    }

    #[tokio::test]
    async fn test_malformed_page() {
        let resolver = resolver();
        let err = resolver.resolve(&Descriptor::Url(url(10))).await.unwrap_err();
        assert!(matches!(err, ResolveError::MalformedDocument { .. }));
    }
}
