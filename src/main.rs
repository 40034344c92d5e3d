fn main() {
    respbench::cmdline();
}
