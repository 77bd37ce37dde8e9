//! Descriptors shipped with the crate, embedded at compile time.
use super::DescriptorSource;

macro_rules! descriptor {
    ($path:literal) => {
        ($path, include_str!(concat!("../../descriptors/", $path)))
    };
}

/// Property type descriptors, relative to the descriptor root.
pub const SYMBOLS: &[(&str, &str)] = &[
    descriptor!("symbols/band_gap.toml"),
    descriptor!("symbols/bulk_modulus.toml"),
    descriptor!("symbols/compliance_tensor_voigt.toml"),
    descriptor!("symbols/conditions/temperature.toml"),
    descriptor!("symbols/density.toml"),
    descriptor!("symbols/elastic_tensor_voigt.toml"),
    descriptor!("symbols/molar_mass.toml"),
    descriptor!("symbols/molar_volume.toml"),
    descriptor!("symbols/poisson_ratio.toml"),
    descriptor!("symbols/pugh_ratio.toml"),
    descriptor!("symbols/refractive_index.toml"),
    descriptor!("symbols/shear_modulus.toml"),
    descriptor!("symbols/youngs_modulus.toml"),
];

/// Model descriptors, relative to the descriptor root.
pub const MODELS: &[(&str, &str)] = &[
    descriptor!("models/elastic_compliance_voigt.toml"),
    descriptor!("models/isotropic_elastic_moduli.toml"),
    descriptor!("models/molar_volume.toml"),
    descriptor!("models/moss_relation.toml"),
    descriptor!("models/pugh_ratio.toml"),
];

pub fn sources() -> impl Iterator<Item = DescriptorSource> {
    let symbols = SYMBOLS
        .iter()
        .map(|(origin, text)| DescriptorSource::property_type(*origin, *text));
    let models = MODELS
        .iter()
        .map(|(origin, text)| DescriptorSource::model(*origin, *text));
    symbols.chain(models)
}
