// Ingest Flow Infrastructure - Filesystem Adapter
// Implements: DepositStore, MetadataMapper

mod bag;
mod deposit_store;
mod metadata_mapper;

pub use bag::{find_bag_dir, read_bag_info, read_manifest, MANIFEST_PREFIX};
pub use deposit_store::FsDepositStore;
pub use metadata_mapper::{BagMetadataMapper, DATASET_DOCUMENT};

#[cfg(test)]
pub(crate) mod test_support;
