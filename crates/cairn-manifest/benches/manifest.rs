use cairn_manifest::{encode, hash_content, Manifest};

fn make_paths(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("/assets/{i:05}/bundle.js")).collect()
}

#[divan::bench(args = [100, 1000, 20000])]
fn encode_manifest(bencher: divan::Bencher, count: usize) {
    let paths = make_paths(count);
    let hashes: Vec<_> = paths.iter().map(|p| hash_content(p.as_bytes())).collect();
    bencher.bench(|| {
        encode(divan::black_box(
            paths.iter().map(String::as_str).zip(hashes.iter().copied()),
        ))
    });
}

#[divan::bench(args = [100, 1000, 20000])]
fn lookup_hit(bencher: divan::Bencher, count: usize) {
    let paths = make_paths(count);
    let manifest = Manifest::build(
        paths
            .iter()
            .map(|p| (p.as_str(), hash_content(p.as_bytes()))),
    );
    let probe = &paths[count / 2];
    bencher.bench(|| manifest.lookup(divan::black_box(probe)));
}

#[divan::bench(args = [100, 1000, 20000])]
fn decode_and_validate(bencher: divan::Bencher, count: usize) {
    let paths = make_paths(count);
    let bytes = encode(
        paths
            .iter()
            .map(|p| (p.as_str(), hash_content(p.as_bytes()))),
    );
    bencher.bench(|| Manifest::from_bytes(divan::black_box(bytes.clone())).unwrap());
}

fn main() {
    divan::main();
}
