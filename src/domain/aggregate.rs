//! Join packages against the taxonomy and count them bottom-up.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::domain::entities::{
    normalize_code, BottomClassification, MidClassification, Package, Taxonomy,
    TopClassification,
};

/// Packages grouped by case-folded classification code, input order kept.
struct PackageIndex<'a> {
    by_code: HashMap<String, Vec<&'a Package>>,
}

impl<'a> PackageIndex<'a> {
    fn new(packages: &'a [Package]) -> Self {
        let mut by_code: HashMap<String, Vec<&'a Package>> = HashMap::new();
        for package in packages {
            by_code.entry(package.code_key()).or_default().push(package);
        }
        Self { by_code }
    }

    fn tagged(&self, code: &str) -> Vec<Package> {
        self.by_code
            .get(&normalize_code(code))
            .map(|found| found.iter().map(|p| (*p).clone()).collect())
            .unwrap_or_default()
    }
}

/// Annotate a copy of `taxonomy` with the packages filed under each node.
///
/// Every node receives the packages whose classification code equals its own
/// code (case-insensitive). Counts are summed bottom-up:
///
/// * bottom: `len(packages)`
/// * mid: `len(packages) + sum(bottom counts)`
/// * top: `len(packages) + sum(direct bottom counts) + sum(mid counts)`
///
/// Packages whose code matches no node are dropped without error. Node order
/// follows the input taxonomy and packages keep their input order.
#[instrument(level = "debug", skip_all, fields(packages = packages.len(), tops = taxonomy.len()))]
pub fn aggregate(packages: &[Package], taxonomy: &Taxonomy) -> Taxonomy {
    let index = PackageIndex::new(packages);

    let tops: Vec<TopClassification> = taxonomy
        .iter()
        .map(|top| aggregate_top(&index, top))
        .collect();
    let annotated = Taxonomy::new(tops);

    let placed = annotated.total_packages();
    if placed < packages.len() {
        debug!(
            "{} of {} packages carry a code outside the taxonomy",
            packages.len() - placed,
            packages.len()
        );
    }
    annotated
}

fn aggregate_top(index: &PackageIndex<'_>, top: &TopClassification) -> TopClassification {
    let packages = index.tagged(&top.code);
    let classifications: Vec<BottomClassification> = top
        .classifications
        .iter()
        .map(|b| aggregate_bottom(index, b))
        .collect();
    let subclassifications: Vec<MidClassification> = top
        .subclassifications
        .iter()
        .map(|m| aggregate_mid(index, m))
        .collect();

    let package_count = packages.len()
        + classifications.iter().map(|b| b.package_count).sum::<usize>()
        + subclassifications
            .iter()
            .map(|m| m.package_count)
            .sum::<usize>();

    TopClassification {
        short_name: top.short_name.clone(),
        code: top.code.clone(),
        packages,
        classifications,
        subclassifications,
        package_count,
    }
}

fn aggregate_mid(index: &PackageIndex<'_>, mid: &MidClassification) -> MidClassification {
    let packages = index.tagged(&mid.code);
    let classifications: Vec<BottomClassification> = mid
        .classifications
        .iter()
        .map(|b| aggregate_bottom(index, b))
        .collect();
    let package_count =
        packages.len() + classifications.iter().map(|b| b.package_count).sum::<usize>();

    MidClassification {
        name: mid.name.clone(),
        code: mid.code.clone(),
        packages,
        classifications,
        package_count,
    }
}

fn aggregate_bottom(index: &PackageIndex<'_>, bottom: &BottomClassification) -> BottomClassification {
    let packages = index.tagged(&bottom.code);
    BottomClassification {
        name: bottom.name.clone(),
        code: bottom.code.clone(),
        package_count: packages.len(),
        packages,
    }
}

/// Collapse packages sharing a name into one entry.
///
/// The first occurrence fixes the position; a later verified row replaces an
/// earlier unverified one.
pub fn dedupe_packages(packages: Vec<Package>) -> Vec<Package> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut result: Vec<Package> = Vec::with_capacity(packages.len());

    for package in packages {
        match positions.get(&package.name) {
            Some(&pos) => {
                if package.verified && !result[pos].verified {
                    result[pos] = package;
                }
            }
            None => {
                positions.insert(package.name.clone(), result.len());
                result.push(package);
            }
        }
    }
    result
}
