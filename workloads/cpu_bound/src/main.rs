entry::workload_main!(workload::run);
