fn main() {
    println!("cargo:rerun-if-changed=./master.proto");
    tonic_build::compile_protos("./master.proto")
        .unwrap_or_else(|err| panic!("Failed to compile protos {:?}", err));
}
