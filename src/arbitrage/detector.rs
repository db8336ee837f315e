use std::collections::HashMap;
use crate::types::{ArbitrageOpportunity, FundingQuote};

pub type OpportunityFilter = Box<dyn Fn(&ArbitrageOpportunity) -> bool + Send + Sync>;

/// Output of one detection pass, both lists ordered by descending hourly spread.
#[derive(Clone, Debug, Default)]
pub struct Detection {
    /// One extreme pair per symbol, after the optional filter.
    pub best: Vec<ArbitrageOpportunity>,
    /// Every negative-rate venue against every positive-rate venue.
    pub all: Vec<ArbitrageOpportunity>,
}

/// Pairs the venue paying longs the most (most negative funding) with the
/// venue paying shorts the most (most positive funding) for each symbol.
///
/// Zero rates carry no signal and never become a leg. Among equal extreme
/// rates the quote seen first in the input wins.
pub struct ArbitrageDetector {
    filter: Option<OpportunityFilter>,
}

impl ArbitrageDetector {
    pub fn new() -> Self {
        ArbitrageDetector { filter: None }
    }

    /// Applies `filter` to the best pair of each symbol; `all` is unaffected.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&ArbitrageOpportunity) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Keeps only best pairs with `exchange` on either leg.
    pub fn requiring_exchange(exchange: impl Into<String>) -> Self {
        let exchange = exchange.into();
        ArbitrageDetector::new().with_filter(move |opportunity| opportunity.involves(&exchange))
    }

    pub fn detect(&self, quotes: &[FundingQuote]) -> Detection {
        let mut detection = Detection::default();

        for (_, group) in group_by_symbol(quotes) {
            let negatives: Vec<&FundingQuote> = group
                .iter()
                .copied()
                .filter(|q| q.hourly_rate_pct() < 0.0)
                .collect();
            let positives: Vec<&FundingQuote> = group
                .iter()
                .copied()
                .filter(|q| q.hourly_rate_pct() > 0.0)
                .collect();

            if negatives.is_empty() || positives.is_empty() {
                continue;
            }

            let long = first_extreme(&negatives, |candidate, current| candidate < current);
            let short = first_extreme(&positives, |candidate, current| candidate > current);

            let best = ArbitrageOpportunity::from_legs(long, short);
            if self.filter.as_ref().map_or(true, |keep| keep(&best)) {
                detection.best.push(best);
            }

            for pos in &positives {
                for neg in &negatives {
                    detection.all.push(ArbitrageOpportunity::from_legs(neg, pos));
                }
            }
        }

        sort_by_spread(&mut detection.best);
        sort_by_spread(&mut detection.all);

        tracing::debug!(
            "Detected {} best / {} total opportunities from {} quotes",
            detection.best.len(),
            detection.all.len(),
            quotes.len()
        );

        detection
    }
}

impl Default for ArbitrageDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Groups quotes by symbol, keeping first-appearance order of symbols and quotes.
fn group_by_symbol(quotes: &[FundingQuote]) -> Vec<(&str, Vec<&FundingQuote>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&FundingQuote>)> = Vec::new();

    for quote in quotes {
        let slot = *index.entry(quote.symbol.as_str()).or_insert_with(|| {
            groups.push((quote.symbol.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(quote);
    }

    groups
}

/// Returns the first quote whose rate is not beaten under `better`.
fn first_extreme<'a>(
    quotes: &[&'a FundingQuote],
    better: impl Fn(f64, f64) -> bool,
) -> &'a FundingQuote {
    let mut extreme = quotes[0];
    for quote in &quotes[1..] {
        if better(quote.hourly_rate_pct(), extreme.hourly_rate_pct()) {
            extreme = quote;
        }
    }
    extreme
}

// Stable sort: equal spreads keep detection order.
fn sort_by_spread(opportunities: &mut [ArbitrageOpportunity]) {
    opportunities.sort_by(|a, b| b.spread_hourly.total_cmp(&a.spread_hourly));
}
