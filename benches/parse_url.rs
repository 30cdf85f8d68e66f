#[macro_use]
extern crate bencher;

use bencher::{black_box, Bencher};

use urlcanon::Url;

fn short(bench: &mut Bencher) {
    let url = "https://example.com/bench";

    bench.bytes = url.len() as u64;
    bench.iter(|| Url::parse(black_box(url)));
}

fn with_query(bench: &mut Bencher) {
    let url = "https://example.com/parkbench?tre=es&st=uff";

    bench.bytes = url.len() as u64;
    bench.iter(|| Url::parse(black_box(url)));
}

fn dotted_path(bench: &mut Bencher) {
    let url = "https://example.com/a/b/c/../../d/./e/../f";

    bench.bytes = url.len() as u64;
    bench.iter(|| Url::parse(black_box(url)));
}

fn ipv4_octal(bench: &mut Bencher) {
    let url = "https://0300.0250.00.01/";

    bench.bytes = url.len() as u64;
    bench.iter(|| Url::parse(black_box(url)));
}

fn ipv6(bench: &mut Bencher) {
    let url = "https://[2001:db8:0:0:0:0:2:1]:8080/";

    bench.bytes = url.len() as u64;
    bench.iter(|| Url::parse(black_box(url)));
}

fn unicode_host(bench: &mut Bencher) {
    let url = "https://مثال.example/";

    bench.bytes = url.len() as u64;
    bench.iter(|| Url::parse(black_box(url)));
}

fn punycode_host(bench: &mut Bencher) {
    let url = "https://xn--mgbh0fb.example/";

    bench.bytes = url.len() as u64;
    bench.iter(|| Url::parse(black_box(url)));
}

fn file_drive(bench: &mut Bencher) {
    let url = "file:///C:/Program Files/App/app.exe";

    bench.bytes = url.len() as u64;
    bench.iter(|| Url::parse(black_box(url)));
}

fn filesystem_nested(bench: &mut Bencher) {
    let url = "filesystem:http://example.com/temporary/dir/file.txt";

    bench.bytes = url.len() as u64;
    bench.iter(|| Url::parse(black_box(url)));
}

fn resolve_relative(bench: &mut Bencher) {
    let base = Url::parse("https://example.com/a/b/c?q");
    let reference = "../../d/e.html";

    bench.bytes = reference.len() as u64;
    bench.iter(|| base.resolve(black_box(reference)));
}

benchmark_group!(
    benches,
    short,
    with_query,
    dotted_path,
    ipv4_octal,
    ipv6,
    unicode_host,
    punycode_host,
    file_drive,
    filesystem_nested,
    resolve_relative,
);
benchmark_main!(benches);
