//! Environment source: QSTAGE_<SECTION>__<KEY>, e.g. QSTAGE_VALIDATION__ALLOW_ZERO_SUM

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("QSTAGE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
