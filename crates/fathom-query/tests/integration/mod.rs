mod compilation;
